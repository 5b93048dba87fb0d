//! Per-file context generation and token-budget enforcement.

use crate::importance::{ImportanceTier, build_marker_dirs, classify};
use crate::tokens::{estimate_tokens, exceeds_inline_cap, per_file_budget};
use chrono::Utc;
use serde::Deserialize;
use vibe_core::{FileContext, ProjectContext};
use vibe_llm::{LmClient, LmRequest};
use vibe_protocol::strip_fence;

#[derive(Debug, Deserialize)]
struct FileSummaryResponse {
    summary: String,
    #[serde(default)]
    key_elements: Vec<String>,
    purpose: String,
    #[serde(default)]
    dependencies: Vec<String>,
}

fn file_type_of(path: &str) -> String {
    path.rsplit_once('.')
        .map(|(_, ext)| ext.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Ask the LM to summarize a single file, respecting the per-file token
/// budget. Files over the 2 KiB inline cap are described to the LM as
/// available through the Tool Server rather than embedded.
pub async fn regenerate_file_context(
    path: &str,
    content: &str,
    remaining_budget_tokens: u32,
    lm: &dyn LmClient,
) -> anyhow::Result<FileContext> {
    let budget = per_file_budget(remaining_budget_tokens);
    let body = if exceeds_inline_cap(content) {
        format!(
            "The file '{path}' is larger than 2KiB; request its full content via the \
             vibe_read_file tool rather than relying on this prompt."
        )
    } else {
        format!("File '{path}':\n{content}")
    };

    let system = "Summarize a single source file. Respond with EXACTLY one JSON object: \
        {\"summary\": string, \"key_elements\": [string], \"purpose\": string, \
        \"dependencies\": [string]}. Keep the summary within roughly \
        ".to_string() + &budget.to_string() + " tokens.";

    let raw = lm.complete(LmRequest::new(system, body)).await?;
    let stripped = strip_fence(&raw);
    let parsed: FileSummaryResponse = serde_json::from_str(&stripped)
        .or_else(|_| serde_json::from_str(&strip_fence(&stripped)))?;

    let tokens_used = estimate_tokens(&parsed.summary).min(budget);

    Ok(FileContext {
        path: path.to_string(),
        file_type: file_type_of(path),
        size: content.len() as u64,
        last_modified: Utc::now(),
        summary: parsed.summary,
        key_elements: parsed.key_elements,
        purpose: parsed.purpose,
        dependencies: parsed.dependencies,
        tokens_used,
        needs_update: false,
    })
}

/// Insert (or replace) a file's context, enforcing invariant I4: if the
/// addition would exceed `tokens_limit`, evict the *least-important*
/// existing entries first, before adding
/// the new one.
pub fn add_file_context(ctx: &mut ProjectContext, overhead: u32, new_entry: FileContext) {
    let all_paths: Vec<String> = ctx
        .files
        .keys()
        .cloned()
        .chain(std::iter::once(new_entry.path.clone()))
        .collect();
    let marker_dirs = build_marker_dirs(&all_paths);

    ctx.files.insert(new_entry.path.clone(), new_entry);
    ctx.recompute_tokens_used(overhead);

    while !ctx.is_within_budget() {
        let least_important = ctx
            .files
            .iter()
            .max_by_key(|(path, _)| classify(path, &marker_dirs) as i32)
            .map(|(path, _)| path.clone());
        match least_important {
            Some(path) => {
                ctx.files.remove(&path);
                ctx.recompute_tokens_used(overhead);
            }
            None => break,
        }
    }
}

/// Mark a path's context stale without discarding it: retained
/// until [`regenerate_file_context`] completes for that path.
pub fn mark_needs_update(ctx: &mut ProjectContext, path: &str) {
    if let Some(fc) = ctx.files.get_mut(path) {
        fc.needs_update = true;
    }
}

#[allow(dead_code)]
fn most_important_tier() -> ImportanceTier {
    ImportanceTier::EntryPoint
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use vibe_core::ProjectStructure;

    fn empty_context(tokens_limit: u32) -> ProjectContext {
        ProjectContext {
            project_name: "demo".into(),
            language: "Rust".into(),
            generated_at: Utc::now(),
            total_files: 0,
            description: "demo".into(),
            dependencies: vec![],
            files: HashMap::new(),
            structure: ProjectStructure::default(),
            tokens_used: 0,
            tokens_limit,
        }
    }

    fn fc(path: &str, tokens: u32) -> FileContext {
        FileContext {
            path: path.to_string(),
            file_type: "rs".into(),
            size: 10,
            last_modified: Utc::now(),
            summary: "s".into(),
            key_elements: vec![],
            purpose: "p".into(),
            dependencies: vec![],
            tokens_used: tokens,
            needs_update: false,
        }
    }

    #[test]
    fn evicts_least_important_when_over_budget() {
        let mut ctx = empty_context(100);
        add_file_context(&mut ctx, 0, fc("README.md", 60));
        add_file_context(&mut ctx, 0, fc("src/main.rs", 60));
        // README.md (Other tier) should be evicted to make room for main.rs (EntryPoint).
        assert!(!ctx.files.contains_key("README.md"));
        assert!(ctx.files.contains_key("src/main.rs"));
        assert!(ctx.is_within_budget());
    }

    #[test]
    fn mark_needs_update_retains_old_entry() {
        let mut ctx = empty_context(1000);
        add_file_context(&mut ctx, 0, fc("a.rs", 10));
        mark_needs_update(&mut ctx, "a.rs");
        assert!(ctx.files.get("a.rs").unwrap().needs_update);
    }
}
