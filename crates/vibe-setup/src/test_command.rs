//! Selecting a test command out of whatever the analysis step produced.

use vibe_core::CodeAnalysisResult;

/// Sentinel used when nothing in the analysis looks like a test command.
pub const NO_TEST_COMMAND_SENTINEL: &str = "echo 'no test command configured'";

/// Pick the command used to validate generated code: the first
/// `test_commands` entry, else the first `commands` entry mentioning "test"
/// (case-insensitive), else the first `commands` entry, else the sentinel.
pub fn select_test_command(analysis: &CodeAnalysisResult) -> String {
    if let Some(cmd) = analysis.test_commands.first() {
        return cmd.clone();
    }
    if let Some(cmd) = analysis
        .commands
        .iter()
        .find(|c| c.to_lowercase().contains("test"))
    {
        return cmd.clone();
    }
    if let Some(cmd) = analysis.commands.first() {
        return cmd.clone();
    }
    NO_TEST_COMMAND_SENTINEL.to_string()
}
