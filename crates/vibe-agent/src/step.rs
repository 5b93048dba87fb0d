//! Wire shape for one autonomous-agent step.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepAction {
    Continue,
    Complete,
}

#[derive(Debug, Clone, Deserialize)]
pub struct McpCallRequest {
    pub tool: String,
    #[serde(default, alias = "params")]
    pub arguments: Map<String, Value>,
    /// The LM's stated reason for this call; carried for logging/prompting
    /// only, not required for dispatch.
    #[serde(default)]
    pub purpose: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentStepResponse {
    pub action: StepAction,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub mcp_calls: Vec<McpCallRequest>,
    #[serde(default)]
    pub next_step: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolCallOutcome {
    pub tool: String,
    pub success: bool,
    pub output: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepLogEntry {
    pub step: u32,
    pub action: StepAction,
    pub reasoning: String,
    pub tool_results: Vec<ToolCallOutcome>,
}

/// How an autonomous run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    StepsExhausted,
}

#[derive(Debug, Clone, Serialize)]
pub struct AutonomousRunResult {
    pub status: RunStatus,
    pub summary: String,
    pub steps_taken: u32,
    pub log: Vec<StepLogEntry>,
    /// `path -> content` for every file the loop wrote over the whole run.
    #[serde(default)]
    pub generated_code: HashMap<String, String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
}
