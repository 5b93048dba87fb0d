//! Per-file test command selection: ask the LM whether each of the
//! project's known test commands is suitable for a given generated file,
//! adapting the first candidate via a second call when none is.

use serde::Deserialize;
use vibe_llm::{LmClient, LmRequest};
use vibe_protocol::strip_fence;

#[derive(Debug, Default, Deserialize)]
struct Suitability {
    #[serde(default)]
    suitable: bool,
}

#[derive(Debug, Deserialize)]
struct AdaptedCommand {
    command: String,
}

fn suitability_system_prompt() -> String {
    r#"You decide whether a shell command is the right way to run one
generated test file. Respond with EXACTLY one JSON object:

{"suitable": boolean}"#
        .to_string()
}

fn suitability_user_prompt(command: &str, file: &str) -> String {
    format!("Candidate command: {command}\nTest file: {file}\n\nIs this command the right way to run this specific file?")
}

fn adapt_system_prompt() -> String {
    r#"None of the project's known test commands fit this file. Adapt the
given base command so it runs this one file instead of the whole suite.
Respond with EXACTLY one JSON object:

{"command": string}"#
        .to_string()
}

fn adapt_user_prompt(base_command: &str, file: &str) -> String {
    format!("Base command: {base_command}\nTest file: {file}\n\nAdapt the base command to run only this file.")
}

/// Picks the command used to execute `file`: the first of `candidates` the
/// LM judges suitable, or an LM-adapted form of the first candidate. With no
/// candidates at all, asks the LM to adapt a bare invocation of the file.
pub async fn select_command_for_file(
    file: &str,
    candidates: &[String],
    lm: &dyn LmClient,
) -> anyhow::Result<String> {
    for candidate in candidates {
        let raw = lm
            .complete(LmRequest::new(
                suitability_system_prompt(),
                suitability_user_prompt(candidate, file),
            ))
            .await?;
        let stripped = strip_fence(&raw);
        let verdict: Suitability = serde_json::from_str(&stripped)
            .or_else(|_| serde_json::from_str(&strip_fence(&stripped)))
            .unwrap_or_default();
        if verdict.suitable {
            return Ok(candidate.clone());
        }
    }

    let base = candidates
        .first()
        .cloned()
        .unwrap_or_else(|| file.to_string());
    let raw = lm
        .complete(LmRequest::new(adapt_system_prompt(), adapt_user_prompt(&base, file)))
        .await?;
    let stripped = strip_fence(&raw);
    let adapted: AdaptedCommand = serde_json::from_str(&stripped)
        .or_else(|_| serde_json::from_str(&strip_fence(&stripped)))?;
    Ok(adapted.command)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vibe_llm::MockLmClient;

    #[tokio::test]
    async fn picks_first_suitable_candidate() {
        let lm = MockLmClient::with_responses([r#"{"suitable": false}"#, r#"{"suitable": true}"#]);
        let candidates = vec!["go test ./...".to_string(), "pytest".to_string()];
        let command = select_command_for_file("test_a.py", &candidates, &lm)
            .await
            .unwrap();
        assert_eq!(command, "pytest");
    }

    #[tokio::test]
    async fn adapts_first_candidate_when_none_suitable() {
        let lm = MockLmClient::with_responses([
            r#"{"suitable": false}"#,
            r#"{"command": "pytest test_a.py -k test_a"}"#,
        ]);
        let candidates = vec!["pytest".to_string()];
        let command = select_command_for_file("test_a.py", &candidates, &lm)
            .await
            .unwrap();
        assert_eq!(command, "pytest test_a.py -k test_a");
    }

    #[tokio::test]
    async fn adapts_bare_invocation_when_no_candidates() {
        let lm = MockLmClient::with_responses([r#"{"command": "python test_a.py"}"#]);
        let command = select_command_for_file("test_a.py", &[], &lm).await.unwrap();
        assert_eq!(command, "python test_a.py");
    }
}
