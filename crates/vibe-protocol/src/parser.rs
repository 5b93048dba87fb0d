//! Parse policy and JSON-repair retry loop.

use crate::envelope::{LmResponseEnvelope, validate_envelope};
use regex::Regex;
use std::sync::OnceLock;
use tracing::{debug, warn};
use vibe_core::VibeError;
use vibe_llm::{LmClient, LmRequest};

/// Total attempts the parser gets before surfacing [`VibeError::ParseError`]:
/// the first parse of the raw text, plus up to two repair round-trips.
const MAX_PARSE_ATTEMPTS: u32 = 3;

fn fence_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?s)```[A-Za-z0-9_+-]*\s*\n?(.*?)\n?```").expect("static fence regex")
    })
}

/// Strip surrounding whitespace and, if the text is fenced, extract the
/// inner block. Falls through to the raw (trimmed) text otherwise.
pub fn strip_fence(raw: &str) -> String {
    let trimmed = raw.trim();
    if let Some(captures) = fence_pattern().captures(trimmed) {
        if let Some(inner) = captures.get(1) {
            return inner.as_str().trim().to_string();
        }
    }
    trimmed.to_string()
}

fn try_parse(raw: &str) -> Result<LmResponseEnvelope, String> {
    let candidate = strip_fence(raw);
    let envelope: LmResponseEnvelope =
        serde_json::from_str(&candidate).map_err(|e| format!("JSON parse error: {e}"))?;
    validate_envelope(&envelope).map_err(|e| format!("schema violation: {e}"))?;
    Ok(envelope)
}

/// Parse an LM response into a validated [`LmResponseEnvelope`].
///
/// On first-pass failure, issues a pure JSON-repair prompt back to the LM
/// with the raw (unparseable) text, up to [`MAX_PARSE_ATTEMPTS`] total
/// attempts, before surfacing [`VibeError::ParseError`].
pub async fn parse_response_with_repair(
    raw: &str,
    lm: &dyn LmClient,
) -> Result<LmResponseEnvelope, VibeError> {
    let mut current = raw.to_string();
    let mut last_error = String::new();

    for attempt in 1..=MAX_PARSE_ATTEMPTS {
        match try_parse(&current) {
            Ok(envelope) => {
                if attempt > 1 {
                    debug!(attempt, "LM response parsed after repair");
                }
                return Ok(envelope);
            }
            Err(e) => {
                last_error = e;
                if attempt == MAX_PARSE_ATTEMPTS {
                    break;
                }
                warn!(attempt, error = %last_error, "LM response failed to parse, requesting repair");
                let repair_request = LmRequest::new(
                    "You repair malformed JSON. Respond with ONLY the corrected JSON object, \
                     no prose, no code fences.",
                    format!(
                        "This text was supposed to be a single JSON object matching the \
                         protocol envelope schema but failed to parse ({last_error}). \
                         Return the corrected JSON only:\n\n{current}"
                    ),
                );
                current = lm
                    .complete(repair_request)
                    .await
                    .map_err(|e| VibeError::ParseError(e.to_string()))?;
            }
        }
    }

    Err(VibeError::ParseError(last_error))
}
