pub mod command_select;
pub mod failure;
pub mod generate;
pub mod prompt;
pub mod review;
pub mod validate_loop;

pub use command_select::select_command_for_file;
pub use failure::categorize_failure;
pub use generate::{generate, GeneratedCode};
pub use prompt::{fix_user_prompt, generation_system_prompt, generation_user_prompt};
pub use review::{is_critical, review_generated_code};
pub use validate_loop::{generate_and_validate, FileTestResult, TestGenerationOutcome, MAX_ATTEMPTS};
