//! The single combined analysis+context LM call.

use crate::context::{add_file_context, regenerate_file_context};
use crate::importance::sort_by_importance;
use crate::schema::{system_prompt, user_prompt};
use crate::tokens::{budget_after_overhead, metadata_overhead_tokens};
use chrono::Utc;
use serde::Deserialize;
use std::collections::HashMap;
use vibe_core::{CodeAnalysisResult, ProjectContext, ProjectStructure, VibeError};
use vibe_llm::{LmClient, LmRequest};
use vibe_protocol::strip_fence;

#[derive(Debug, Deserialize)]
struct ContextPayload {
    project_name: String,
    language: String,
    description: String,
    #[serde(default)]
    dependencies: Vec<String>,
    #[serde(default)]
    structure: ProjectStructure,
}

#[derive(Debug, Deserialize)]
struct AnalysisAndContextResponse {
    analysis: CodeAnalysisResult,
    context: ContextPayload,
}

fn parse_combined(raw: &str) -> Result<AnalysisAndContextResponse, String> {
    // First attempt: parse as-is. Second attempt: unwrap fenced code blocks
    // and retry once.
    serde_json::from_str(raw)
        .or_else(|_| serde_json::from_str(&strip_fence(raw)))
        .map_err(|e| e.to_string())
}

/// Default token budget for a freshly generated [`ProjectContext`].
pub const DEFAULT_TOKENS_LIMIT: u32 = 8_000;

/// Run the single LM call producing both [`CodeAnalysisResult`] and the
/// initial [`ProjectContext`], then populate per-file summaries up to the
/// token budget in importance order.
pub async fn analyze_project(
    files: &HashMap<String, String>,
    lm: &dyn LmClient,
    tokens_limit: u32,
) -> Result<(CodeAnalysisResult, ProjectContext), VibeError> {
    let request = LmRequest::new(system_prompt(), user_prompt(files));
    let raw = lm
        .complete(request)
        .await
        .map_err(|e| VibeError::ParseError(e.to_string()))?;

    let parsed = parse_combined(&raw).map_err(VibeError::ParseError)?;

    let mut description = parsed.context.description;
    if description.chars().count() > 100 {
        description = description.chars().take(100).collect();
    }

    let mut context = ProjectContext {
        project_name: parsed.context.project_name,
        language: parsed.context.language,
        generated_at: Utc::now(),
        total_files: files.len() as u32,
        description,
        dependencies: parsed.context.dependencies,
        files: HashMap::new(),
        structure: parsed.context.structure,
        tokens_used: 0,
        tokens_limit,
    };

    let overhead = metadata_overhead_tokens();
    let mut remaining = budget_after_overhead(tokens_limit);
    let mut ordered: Vec<String> = files.keys().cloned().collect();
    sort_by_importance(&mut ordered);

    for path in ordered {
        if remaining == 0 {
            break;
        }
        let content = &files[&path];
        match regenerate_file_context(&path, content, remaining, lm).await {
            Ok(fc) => {
                remaining = remaining.saturating_sub(fc.tokens_used);
                add_file_context(&mut context, overhead, fc);
            }
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "skipping file context generation");
            }
        }
    }

    Ok((parsed.analysis, context))
}

#[cfg(test)]
mod tests {
    use super::*;
    use vibe_llm::MockLmClient;

    #[tokio::test]
    async fn happy_path_single_file_python() {
        let combined = r#"{
            "analysis": {
                "language": "Python",
                "framework": null,
                "docker_image": "python:3.12-slim",
                "install_commands": [],
                "commands": ["python -m py_compile hello.py"],
                "test_commands": ["python -m pytest"],
                "working_dir": "/workspace",
                "project_type": "script",
                "dependencies": [],
                "reasoning": "single script"
            },
            "context": {
                "project_name": "hello",
                "language": "Python",
                "description": "a tiny python script",
                "dependencies": [],
                "structure": {"directories": [], "file_types": {"py": 1}}
            }
        }"#;
        let file_summary = r#"{"summary":"prints hi","key_elements":["print"],"purpose":"demo","dependencies":[]}"#;
        let lm = MockLmClient::with_responses([combined, file_summary]);

        let mut files = HashMap::new();
        files.insert("hello.py".to_string(), "print(\"hi\")".to_string());

        let (analysis, context) = analyze_project(&files, &lm, DEFAULT_TOKENS_LIMIT)
            .await
            .unwrap();

        assert_eq!(analysis.language, "Python");
        assert!(analysis.install_commands.is_empty());
        assert!(!analysis.test_commands.is_empty());
        assert!(context.is_within_budget());
        assert!(context.files.contains_key("hello.py"));
    }

    #[tokio::test]
    async fn parses_fenced_combined_response() {
        let combined = "```json\n{\"analysis\":{\"language\":\"Go\",\"docker_image\":\"golang:1.22\",\"install_commands\":[],\"commands\":[],\"test_commands\":[],\"working_dir\":\"/workspace\",\"dependencies\":[],\"reasoning\":\"\"},\"context\":{\"project_name\":\"demo\",\"language\":\"Go\",\"description\":\"demo\",\"dependencies\":[],\"structure\":{\"directories\":[],\"file_types\":{}}}}\n```";
        let lm = MockLmClient::new();
        let files = HashMap::new();
        let (analysis, _context) = analyze_project(&files, &lm, DEFAULT_TOKENS_LIMIT)
            .await
            .unwrap();
        assert_eq!(analysis.language, "Go");
    }
}
