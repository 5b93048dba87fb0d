//! LM review pass: catches references to functions/classes that don't exist
//! in the project before ever running the generated code.

use std::collections::HashMap;

use serde::Deserialize;
use vibe_core::{TestIssue, TestIssueType};
use vibe_llm::{LmClient, LmRequest};
use vibe_protocol::strip_fence;

#[derive(Debug, Deserialize)]
struct ReviewResponse {
    #[serde(default)]
    issues: Vec<TestIssue>,
}

fn system_prompt() -> String {
    r#"Review generated test code against the project's known files and
summaries. Flag anything that references a function, class, module, or file
that does not appear to exist in the project. Respond with EXACTLY one JSON
object:

{
  "issues": [
    {"filename": string, "type": "syntax_error" | "execution_error" | "missing_dependency" | "invalid_reference" | "configuration_error" | "test_failure", "description": string, "line": number | null}
  ]
}

An empty "issues" array means the code looks sound."#
        .to_string()
}

fn user_prompt(code: &HashMap<String, String>, project_description: &str) -> String {
    let listing: String = code
        .iter()
        .map(|(path, content)| format!("--- {path} ---\n{content}\n"))
        .collect();
    format!("Project: {project_description}\n\nGenerated files:\n{listing}")
}

/// `true` for issue kinds severe enough to block execution and force a
/// regeneration rather than running the code as-is.
pub fn is_critical(issue: &TestIssue) -> bool {
    matches!(
        issue.issue_type,
        TestIssueType::SyntaxError | TestIssueType::InvalidReference | TestIssueType::MissingDependency
    )
}

/// Reviews generated `code` for problems, returning the flagged issues (may
/// be empty).
pub async fn review_generated_code(
    code: &HashMap<String, String>,
    project_description: &str,
    lm: &dyn LmClient,
) -> anyhow::Result<Vec<TestIssue>> {
    let raw = lm
        .complete(LmRequest::new(
            system_prompt(),
            user_prompt(code, project_description),
        ))
        .await?;
    let stripped = strip_fence(&raw);
    let parsed: ReviewResponse = serde_json::from_str(&stripped)
        .or_else(|_| serde_json::from_str(&strip_fence(&stripped)))?;
    Ok(parsed.issues)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vibe_llm::MockLmClient;

    #[tokio::test]
    async fn parses_flagged_invalid_reference() {
        let response = r#"{"issues":[{"filename":"test_x.py","type":"invalid_reference","description":"calls undefined_fn()","line":12}]}"#;
        let lm = MockLmClient::with_responses([response]);
        let mut code = HashMap::new();
        code.insert("test_x.py".to_string(), "undefined_fn()".to_string());

        let issues = review_generated_code(&code, "demo", &lm).await.unwrap();
        assert_eq!(issues.len(), 1);
        assert!(is_critical(&issues[0]));
    }

    #[tokio::test]
    async fn empty_issues_means_clean() {
        let lm = MockLmClient::with_responses([r#"{"issues":[]}"#]);
        let issues = review_generated_code(&HashMap::new(), "demo", &lm)
            .await
            .unwrap();
        assert!(issues.is_empty());
    }

    #[test]
    fn test_failure_is_not_critical() {
        let issue = TestIssue {
            filename: "t.py".into(),
            issue_type: TestIssueType::TestFailure,
            description: "assertion failed".into(),
            line: None,
        };
        assert!(!is_critical(&issue));
    }
}
