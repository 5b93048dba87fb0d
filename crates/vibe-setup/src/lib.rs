pub mod pipeline;
pub mod test_command;

pub use pipeline::{run_setup, SetupOutcome, Stage};
pub use test_command::{select_test_command, NO_TEST_COMMAND_SENTINEL};
