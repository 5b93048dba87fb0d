//! Generate -> review -> per-file command selection -> execute -> fix, up
//! to [`MAX_ATTEMPTS`] times.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{info, warn};
use vibe_core::{RetryBudget, TestIssue, TestIssueType, ValidationResult, VibeError};
use vibe_llm::LmClient;
use vibe_sandbox::SandboxDriver;

use crate::command_select::select_command_for_file;
use crate::failure::categorize_failure;
use crate::generate::generate;
use crate::prompt::{fix_user_prompt, generation_system_prompt, generation_user_prompt};
use crate::review::{is_critical, review_generated_code};

pub const MAX_ATTEMPTS: u32 = 5;

/// The command chosen for one generated file and the result of running it.
#[derive(Debug, Clone, Serialize)]
pub struct FileTestResult {
    pub command: String,
    pub result: ValidationResult,
}

#[derive(Debug, Clone, Serialize)]
pub struct TestGenerationOutcome {
    pub code: HashMap<String, String>,
    /// Files whose chosen command exited 0 on a real execution this attempt.
    /// A file appears here iff it actually passed.
    pub valid_tests: HashMap<String, FileTestResult>,
    pub attempts: u32,
}

/// Generates test code for a project, reviews it for references to things
/// that don't exist, picks a test command per generated file, executes each
/// for real in the sandbox, and retries with the failures fed back to the LM.
/// Gives up after [`MAX_ATTEMPTS`] with no synthesized passing result.
pub async fn generate_and_validate(
    language: &str,
    project_description: &str,
    query: &str,
    container_id: &str,
    test_commands: &[String],
    driver: &dyn SandboxDriver,
    lm: &dyn LmClient,
) -> Result<TestGenerationOutcome, VibeError> {
    let system_prompt = generation_system_prompt();
    let mut user_prompt = generation_user_prompt(language, project_description, query);
    let mut last_code: HashMap<String, String> = HashMap::new();

    for attempt in 1..=MAX_ATTEMPTS {
        let generated = generate(&system_prompt, &user_prompt, lm)
            .await
            .map_err(|e| VibeError::ParseError(e.to_string()))?;
        last_code = generated.code;

        let issues = review_generated_code(&last_code, project_description, lm)
            .await
            .unwrap_or_default();
        let critical: Vec<_> = issues.into_iter().filter(is_critical).collect();
        if !critical.is_empty() {
            warn!(attempt, issues = critical.len(), "review flagged critical issues, regenerating");
            user_prompt = fix_user_prompt(&last_code, &critical_summary(&critical));
            continue;
        }

        if let Err(e) = driver.copy_files(container_id, &last_code).await {
            warn!(attempt, error = %e, "failed to copy generated test code into sandbox");
            user_prompt = fix_user_prompt(&last_code, &e.to_string());
            continue;
        }

        let mut valid_tests = HashMap::new();
        let mut failures: Vec<(String, TestIssueType, String)> = Vec::new();

        for path in last_code.keys() {
            let command = match select_command_for_file(path, test_commands, lm).await {
                Ok(c) => c,
                Err(e) => {
                    warn!(attempt, file = %path, error = %e, "could not select a test command");
                    failures.push((path.clone(), TestIssueType::ExecutionError, e.to_string()));
                    continue;
                }
            };

            let result = driver.execute(container_id, &command).await.map_err(|e| {
                VibeError::ExecutionFailed {
                    exit_code: 1,
                    detail: e.to_string(),
                }
            })?;

            if result.success {
                valid_tests.insert(path.clone(), FileTestResult { command, result });
            } else {
                let issue_type = categorize_failure(&result.output);
                warn!(attempt, file = %path, ?issue_type, exit_code = result.exit_code, "generated test file failed validation");
                failures.push((path.clone(), issue_type, result.output));
            }
        }

        if failures.is_empty() {
            info!(attempt, passing = valid_tests.len(), "every generated test file passed validation");
            return Ok(TestGenerationOutcome {
                code: last_code,
                valid_tests,
                attempts: attempt,
            });
        }

        warn!(attempt, failing = failures.len(), "regenerating after per-file test failures");
        user_prompt = fix_user_prompt(&last_code, &failure_summary(&failures));
    }

    Err(VibeError::RetryExhausted(RetryBudget::TestValidationExhausted))
}

fn critical_summary(critical: &[TestIssue]) -> String {
    critical
        .iter()
        .map(|i| format!("{}: {}", i.filename, i.description))
        .collect::<Vec<_>>()
        .join("; ")
}

fn failure_summary(failures: &[(String, TestIssueType, String)]) -> String {
    failures
        .iter()
        .map(|(path, issue_type, output)| format!("{path} [{issue_type:?}]: {output}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use vibe_core::CodeAnalysisResult;
    use vibe_llm::MockLmClient;
    use vibe_sandbox::{ContainerId, MockSandboxDriver, SandboxError};

    fn clean_review() -> &'static str {
        r#"{"issues":[]}"#
    }

    #[tokio::test]
    async fn succeeds_on_first_attempt() {
        let generation = r#"{"status":"success","response":"ok","code":{"test_a.py":"def test_a(): assert True"}}"#;
        let suitable = r#"{"suitable": true}"#;
        let lm = MockLmClient::with_responses([generation, clean_review(), suitable]);
        let driver = MockSandboxDriver::new();
        let container_id = driver.create_container(&Default::default()).await.unwrap();

        let outcome = generate_and_validate(
            "python",
            "demo project",
            "",
            &container_id,
            &["pytest".to_string()],
            &driver,
            &lm,
        )
        .await
        .unwrap();

        assert_eq!(outcome.attempts, 1);
        assert!(outcome.valid_tests.contains_key("test_a.py"));
        assert_eq!(outcome.valid_tests["test_a.py"].command, "pytest");
    }

    #[tokio::test]
    async fn regenerates_when_review_flags_invalid_reference() {
        let bad_generation = r#"{"status":"success","response":"ok","code":{"test_a.py":"undefined_fn()"}}"#;
        let bad_review = r#"{"issues":[{"filename":"test_a.py","type":"invalid_reference","description":"undefined_fn","line":1}]}"#;
        let good_generation = r#"{"status":"success","response":"ok","code":{"test_a.py":"def test_a(): assert True"}}"#;
        let suitable = r#"{"suitable": true}"#;
        let lm = MockLmClient::with_responses([
            bad_generation,
            bad_review,
            good_generation,
            clean_review(),
            suitable,
        ]);
        let driver = MockSandboxDriver::new();
        let container_id = driver.create_container(&Default::default()).await.unwrap();

        let outcome = generate_and_validate(
            "python",
            "demo project",
            "",
            &container_id,
            &["pytest".to_string()],
            &driver,
            &lm,
        )
        .await
        .unwrap();

        assert_eq!(outcome.attempts, 2);
    }

    /// Delegates everything to [`MockSandboxDriver`] except `execute`, which
    /// fails on its first call (simulating a real assertion failure) then
    /// succeeds on every call after.
    struct FailFirstExecuteDriver {
        inner: MockSandboxDriver,
        calls: AtomicU32,
    }

    #[async_trait::async_trait]
    impl SandboxDriver for FailFirstExecuteDriver {
        async fn create_container(
            &self,
            analysis: &CodeAnalysisResult,
        ) -> Result<ContainerId, SandboxError> {
            self.inner.create_container(analysis).await
        }

        async fn copy_files(
            &self,
            container_id: &str,
            files: &HashMap<String, String>,
        ) -> Result<(), SandboxError> {
            self.inner.copy_files(container_id, files).await
        }

        async fn install_dependencies(
            &self,
            container_id: &str,
            analysis: &CodeAnalysisResult,
        ) -> Result<ValidationResult, SandboxError> {
            self.inner.install_dependencies(container_id, analysis).await
        }

        async fn execute(&self, container_id: &str, command: &str) -> Result<ValidationResult, SandboxError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(ValidationResult::failed(
                    "AssertionError: expected 3 got 2".to_string(),
                    1,
                    Duration::ZERO,
                ))
            } else {
                self.inner.execute(container_id, command).await
            }
        }

        async fn validate(
            &self,
            container_id: &str,
            analysis: &CodeAnalysisResult,
        ) -> Result<ValidationResult, SandboxError> {
            self.inner.validate(container_id, analysis).await
        }

        async fn remove_container(&self, container_id: &str) {
            self.inner.remove_container(container_id).await
        }
    }

    #[tokio::test]
    async fn categorizes_real_failure_and_retries_until_passing() {
        let generation = r#"{"status":"success","response":"ok","code":{"test_a.py":"def test_a(): assert add(1,2)==3"}}"#;
        let suitable = r#"{"suitable": true}"#;
        let lm = MockLmClient::with_responses([
            generation,
            clean_review(),
            suitable,
            generation,
            clean_review(),
            suitable,
        ]);
        let driver = FailFirstExecuteDriver {
            inner: MockSandboxDriver::new(),
            calls: AtomicU32::new(0),
        };
        let container_id = driver.create_container(&Default::default()).await.unwrap();

        let outcome = generate_and_validate(
            "python",
            "demo project",
            "",
            &container_id,
            &["pytest".to_string()],
            &driver,
            &lm,
        )
        .await
        .unwrap();

        assert_eq!(outcome.attempts, 2);
        assert!(outcome.valid_tests.contains_key("test_a.py"));
    }
}
