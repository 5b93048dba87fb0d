pub mod loop_runner;
pub mod step;

pub use loop_runner::{run_autonomous_loop, MAX_STEPS};
pub use step::{
    AgentStepResponse, AutonomousRunResult, McpCallRequest, StepAction, StepLogEntry,
    ToolCallOutcome,
};
