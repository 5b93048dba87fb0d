//! Token budgeting for the project context.

const CHARS_PER_TOKEN: usize = 4;
const METADATA_OVERHEAD_TOKENS: u32 = 500;
const MIN_FILE_TOKEN_FLOOR: u32 = 50;
const INLINE_CONTENT_CAP_BYTES: usize = 2 * 1024;

/// Estimate token count for a chunk of text: ~4 characters per token.
pub fn estimate_tokens(text: &str) -> u32 {
    ((text.len() + CHARS_PER_TOKEN - 1) / CHARS_PER_TOKEN) as u32
}

/// Whether a file's content must be referenced (via the Tool Server) rather
/// than embedded inline in a context-generation prompt.
pub fn exceeds_inline_cap(content: &str) -> bool {
    content.len() > INLINE_CONTENT_CAP_BYTES
}

/// Per-file token budget, given the remaining pool after metadata overhead.
///
/// Each file gets at most 1/4 of what remains, floored at
/// [`MIN_FILE_TOKEN_FLOOR`].
pub fn per_file_budget(remaining_tokens: u32) -> u32 {
    (remaining_tokens / 4).max(MIN_FILE_TOKEN_FLOOR)
}

/// Tokens available for files after reserving metadata overhead.
pub fn budget_after_overhead(tokens_limit: u32) -> u32 {
    tokens_limit.saturating_sub(METADATA_OVERHEAD_TOKENS)
}

pub fn metadata_overhead_tokens() -> u32 {
    METADATA_OVERHEAD_TOKENS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimates_roughly_four_chars_per_token() {
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
        assert_eq!(estimate_tokens(""), 0);
    }

    #[test]
    fn per_file_budget_has_a_floor() {
        assert_eq!(per_file_budget(100), 50);
        assert_eq!(per_file_budget(1000), 250);
    }

    #[test]
    fn inline_cap_matches_two_kib() {
        let small = "x".repeat(2048);
        let big = "x".repeat(2049);
        assert!(!exceeds_inline_cap(&small));
        assert!(exceeds_inline_cap(&big));
    }
}
