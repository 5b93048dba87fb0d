//! The bounded autonomous-agent loop driven by `action = autonomous_work`.

use std::collections::HashMap;
use std::sync::Weak;

use rmcp::model::CallToolRequestParam;
use serde_json::Value;
use tracing::{info, warn};
use vibe_core::VibeError;
use vibe_llm::{LmClient, LmRequest};
use vibe_protocol::strip_fence;
use vibe_session::SessionManager;
use vibe_tools::tools::{dispatch, WRITE_FILE};

use crate::step::{
    AgentStepResponse, AutonomousRunResult, McpCallRequest, RunStatus, StepAction, StepLogEntry,
    ToolCallOutcome,
};

pub const MAX_STEPS: u32 = 10;
const MAX_PARSE_ATTEMPTS: u32 = 3;

fn system_prompt() -> String {
    r#"You are operating autonomously inside a sandboxed coding session. Each
turn you may call MCP tools to inspect or modify the project, then respond
with EXACTLY one JSON object:

{
  "action": "continue" | "complete",
  "reasoning": string,
  "mcp_calls": [{"tool": string, "params": object, "purpose": string | null}],
  "next_step": string | null,
  "summary": string | null
}

Set action to "complete" and fill "summary" once the task is done or you
can make no further progress. Keep mcp_calls empty on the final step."#
        .to_string()
}

fn step_prompt(user_id: &str, query: &str, history: &[StepLogEntry]) -> String {
    let mut prompt = format!("user_id: {user_id}\ntask: {query}\n");
    if !history.is_empty() {
        prompt.push_str("\nPrevious steps:\n");
        for entry in history {
            prompt.push_str(&format!(
                "- step {}: reasoning={:?} tool_results={:?}\n",
                entry.step, entry.reasoning, entry.tool_results
            ));
        }
    }
    prompt
}

async fn parse_step_with_repair(
    raw_first: String,
    lm: &dyn LmClient,
) -> Result<AgentStepResponse, VibeError> {
    let mut current = raw_first;
    let mut last_error = String::new();
    for attempt in 1..=MAX_PARSE_ATTEMPTS {
        let stripped = strip_fence(&current);
        match serde_json::from_str::<AgentStepResponse>(&stripped) {
            Ok(step) => return Ok(step),
            Err(e) => {
                last_error = e.to_string();
                if attempt == MAX_PARSE_ATTEMPTS {
                    break;
                }
                warn!(attempt, error = %last_error, "autonomous step response failed to parse, requesting repair");
                let repair_system = "You repair malformed JSON. Respond with ONLY the \
                    corrected JSON object matching the requested agent-step schema, \
                    no prose, no markdown fences.";
                match lm
                    .complete(LmRequest::new(repair_system.to_string(), current.clone()))
                    .await
                {
                    Ok(repaired) => current = repaired,
                    Err(e) => {
                        last_error = e.to_string();
                        break;
                    }
                }
            }
        }
    }
    Err(VibeError::ParseError(last_error))
}

fn mcp_call_to_request(user_id: &str, call: &McpCallRequest) -> CallToolRequestParam {
    let mut arguments = call.arguments.clone();
    arguments
        .entry("user_id".to_string())
        .or_insert_with(|| serde_json::Value::String(user_id.to_string()));
    CallToolRequestParam {
        name: call.tool.clone().into(),
        arguments: Some(arguments),
    }
}

/// The aggregable side effects of one step's tool calls: the per-call log
/// entries, any files written via `vibe_write_file`, and any `suggestions`
/// surfaced by a tool's JSON result (e.g. `vibe_validate_code`/`vibe_run_tests`).
struct StepToolEffects {
    outcomes: Vec<ToolCallOutcome>,
    generated_code: HashMap<String, String>,
    suggestions: Vec<String>,
}

async fn run_tool_calls(
    sessions: &Weak<SessionManager>,
    user_id: &str,
    calls: &[McpCallRequest],
) -> StepToolEffects {
    let mut outcomes = Vec::with_capacity(calls.len());
    let mut generated_code = HashMap::new();
    let mut suggestions = Vec::new();

    for call in calls {
        let request = mcp_call_to_request(user_id, call);
        // An unknown tool or a tool-level error fails this single call, not
        // the surrounding step or loop.
        let outcome = match dispatch(sessions, &request).await {
            Ok(result) => {
                let text = result
                    .content
                    .first()
                    .and_then(|c| c.as_text())
                    .map(|t| t.text.clone())
                    .unwrap_or_default();
                let success = !result.is_error.unwrap_or(false);

                if success && call.tool == WRITE_FILE {
                    if let (Some(path), Some(content)) = (
                        call.arguments.get("path").and_then(Value::as_str),
                        call.arguments.get("content").and_then(Value::as_str),
                    ) {
                        generated_code.insert(path.to_string(), content.to_string());
                    }
                }
                if success {
                    if let Ok(parsed) = serde_json::from_str::<Value>(&text) {
                        if let Some(items) = parsed.get("suggestions").and_then(Value::as_array) {
                            suggestions.extend(items.iter().filter_map(|s| s.as_str()).map(str::to_string));
                        }
                    }
                }

                ToolCallOutcome {
                    tool: call.tool.clone(),
                    success,
                    output: text,
                }
            }
            Err(e) => ToolCallOutcome {
                tool: call.tool.clone(),
                success: false,
                output: e.to_string(),
            },
        };
        outcomes.push(outcome);
    }

    StepToolEffects {
        outcomes,
        generated_code,
        suggestions,
    }
}

/// Drives the loop for a single `autonomous_work` request: up to
/// [`MAX_STEPS`] steps, each producing zero or more MCP tool calls before the
/// LM decides whether to continue or declare completion.
pub async fn run_autonomous_loop(
    sessions: &Weak<SessionManager>,
    lm: &dyn LmClient,
    user_id: &str,
    query: &str,
) -> Result<AutonomousRunResult, VibeError> {
    let mut log: Vec<StepLogEntry> = Vec::new();
    let mut generated_code: HashMap<String, String> = HashMap::new();
    let mut suggestions: Vec<String> = Vec::new();

    for step in 1..=MAX_STEPS {
        let prompt = step_prompt(user_id, query, &log);
        let raw = lm
            .complete(LmRequest::new(system_prompt(), prompt))
            .await
            .map_err(|e| VibeError::ParseError(e.to_string()))?;
        let response = parse_step_with_repair(raw, lm).await?;

        let effects = run_tool_calls(sessions, user_id, &response.mcp_calls).await;
        info!(step, action = ?response.action, calls = effects.outcomes.len(), "autonomous step completed");
        generated_code.extend(effects.generated_code);
        suggestions.extend(effects.suggestions);

        let entry = StepLogEntry {
            step,
            action: response.action,
            reasoning: response.reasoning.clone(),
            tool_results: effects.outcomes,
        };
        let done = response.action == StepAction::Complete;
        let summary = response.summary.clone();
        log.push(entry);

        if done {
            return Ok(AutonomousRunResult {
                status: RunStatus::Completed,
                summary: summary.unwrap_or_default(),
                steps_taken: step,
                log,
                generated_code,
                suggestions,
            });
        }
    }

    warn!(steps = MAX_STEPS, "autonomous loop exhausted its step budget");
    Ok(AutonomousRunResult {
        status: RunStatus::StepsExhausted,
        summary: "autonomous loop exhausted its step budget without declaring completion".to_string(),
        steps_taken: MAX_STEPS,
        log,
        generated_code,
        suggestions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use vibe_llm::MockLmClient;
    use vibe_sandbox::MockSandboxDriver;

    async fn manager_with_session(user_id: &str) -> Arc<SessionManager> {
        let mgr = Arc::new(SessionManager::new(
            Arc::new(MockSandboxDriver::new()),
            Arc::new(MockLmClient::new()),
        ));
        mgr.create(user_id.to_string(), HashMap::new()).await.unwrap();
        mgr
    }

    #[tokio::test]
    async fn completes_on_first_step() {
        let mgr = manager_with_session("u1").await;
        let weak = Arc::downgrade(&mgr);
        let response = r#"{"action":"complete","reasoning":"done already","mcp_calls":[],"next_step":null,"summary":"nothing to do"}"#;
        let lm = MockLmClient::with_responses([response]);

        let result = run_autonomous_loop(&weak, &lm, "u1", "no-op task")
            .await
            .unwrap();
        assert_eq!(result.steps_taken, 1);
        assert_eq!(result.summary, "nothing to do");
    }

    #[tokio::test]
    async fn continues_then_completes_and_invokes_tool() {
        let mgr = manager_with_session("u1").await;
        let weak = Arc::downgrade(&mgr);
        let step1 = r#"{"action":"continue","reasoning":"list files first","mcp_calls":[{"tool":"vibe_list_files","arguments":{}}],"next_step":"inspect","summary":null}"#;
        let step2 = r#"{"action":"complete","reasoning":"looked around","mcp_calls":[],"next_step":null,"summary":"done"}"#;
        let lm = MockLmClient::with_responses([step1, step2]);

        let result = run_autonomous_loop(&weak, &lm, "u1", "explore the project")
            .await
            .unwrap();
        assert_eq!(result.steps_taken, 2);
        assert_eq!(result.log[0].tool_results.len(), 1);
        assert!(result.log[0].tool_results[0].success);
    }

    #[tokio::test]
    async fn unknown_tool_fails_the_call_not_the_loop() {
        let mgr = manager_with_session("u1").await;
        let weak = Arc::downgrade(&mgr);
        let step1 = r#"{"action":"complete","reasoning":"try a bogus tool","mcp_calls":[{"tool":"vibe_not_real","arguments":{}}],"next_step":null,"summary":"done anyway"}"#;
        let lm = MockLmClient::with_responses([step1]);

        let result = run_autonomous_loop(&weak, &lm, "u1", "task")
            .await
            .unwrap();
        assert_eq!(result.steps_taken, 1);
        assert!(!result.log[0].tool_results[0].success);
        assert_eq!(result.summary, "done anyway");
    }

    #[tokio::test]
    async fn exhausting_step_budget_records_all_steps_and_exhausted_status() {
        let mgr = manager_with_session("u1").await;
        let weak = Arc::downgrade(&mgr);
        let always_continue = r#"{"action":"continue","reasoning":"still working","mcp_calls":[],"next_step":"keep going","summary":null}"#;
        let lm = MockLmClient::with_responses(std::iter::repeat(always_continue).take(MAX_STEPS as usize));

        let result = run_autonomous_loop(&weak, &lm, "u1", "never-ending task")
            .await
            .unwrap();
        assert_eq!(result.status, RunStatus::StepsExhausted);
        assert_eq!(result.steps_taken, MAX_STEPS);
        assert_eq!(result.log.len(), MAX_STEPS as usize);
    }

    #[tokio::test]
    async fn write_file_calls_are_folded_into_generated_code() {
        let mgr = manager_with_session("u1").await;
        let weak = Arc::downgrade(&mgr);
        let step1 = r#"{"action":"complete","reasoning":"write a file","mcp_calls":[{"tool":"vibe_write_file","params":{"path":"a.py","content":"x = 1","generated":true},"purpose":"scaffold"}],"next_step":null,"summary":"wrote it"}"#;
        let lm = MockLmClient::with_responses([step1]);

        let result = run_autonomous_loop(&weak, &lm, "u1", "task")
            .await
            .unwrap();
        assert_eq!(result.generated_code.get("a.py"), Some(&"x = 1".to_string()));
    }
}
