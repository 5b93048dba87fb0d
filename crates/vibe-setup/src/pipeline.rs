//! The setup state machine: Analyze -> CreateContainer -> CopyFiles ->
//! InstallDeps -> GenerateTestCommand -> Ready.

use std::collections::HashMap;
use std::time::Duration;

use tracing::{info, warn};
use vibe_analysis::{analyze_project, repair_analysis};
use vibe_core::{CodeAnalysisResult, ProjectContext, RetryBudget, ValidationResult, VibeError};
use vibe_llm::LmClient;
use vibe_sandbox::{ContainerId, SandboxDriver};

use crate::test_command::select_test_command;

const MAX_CONTAINER_ATTEMPTS: u32 = 3;
const MAX_INSTALL_REPAIR_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Analyze,
    CreateContainer,
    CopyFiles,
    InstallDeps,
    GenerateTestCommand,
    Ready,
}

pub struct SetupOutcome {
    pub container_id: ContainerId,
    pub analysis: CodeAnalysisResult,
    pub context: ProjectContext,
    pub test_command: String,
}

async fn backoff(attempt: u32) {
    tokio::time::sleep(Duration::from_secs(attempt as u64)).await;
}

/// A failed setup step, marked `permanent` when the container-attempt loop
/// in [`run_setup`] must not spend further attempts on it (the repair
/// sub-protocol said `retry_recommended=false`).
struct StepFailure {
    error: VibeError,
    permanent: bool,
}

impl StepFailure {
    fn retryable(error: VibeError) -> Self {
        Self { error, permanent: false }
    }

    fn permanent(error: VibeError) -> Self {
        Self { error, permanent: true }
    }
}

/// Installs dependencies, invoking the repair sub-protocol between attempts
/// when a step fails: the LM is given the failure output and returns a patch
/// (extra pre/post install commands, or a replacement image/working dir). If
/// the repair patch says `retry_recommended=false`, setup fails permanently
/// instead of spending the remaining attempts.
async fn install_with_repair(
    driver: &dyn SandboxDriver,
    lm: &dyn LmClient,
    container_id: &str,
    analysis: &mut CodeAnalysisResult,
) -> Result<ValidationResult, StepFailure> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        let result = driver
            .install_dependencies(container_id, analysis)
            .await
            .map_err(|e| {
                StepFailure::retryable(VibeError::ExecutionFailed {
                    exit_code: 1,
                    detail: e.to_string(),
                })
            })?;
        if result.success {
            return Ok(result);
        }
        if attempt >= MAX_INSTALL_REPAIR_ATTEMPTS {
            return Ok(result);
        }
        warn!(attempt, "install_dependencies failed, requesting a repair patch");
        match repair_analysis(analysis, &result, lm).await {
            Ok(repaired) => {
                if !repaired.patch.retry_recommended {
                    warn!(
                        attempt,
                        root_cause = %repaired.patch.root_cause,
                        "repair sub-protocol recommended against retrying, failing setup permanently"
                    );
                    return Err(StepFailure::permanent(VibeError::RetryExhausted(
                        RetryBudget::SetupFailed,
                    )));
                }
                *analysis = repaired.analysis;
            }
            Err(e) => {
                warn!(error = %e, "repair_analysis call failed, retrying with unchanged analysis");
            }
        }
        backoff(attempt).await;
    }
}

/// Creates a container, copies files in, and installs dependencies. On
/// failure at any of these container-bound steps the container is torn down
/// so the next attempt starts clean.
async fn run_container_attempt(
    driver: &dyn SandboxDriver,
    lm: &dyn LmClient,
    files: &HashMap<String, String>,
    analysis: &mut CodeAnalysisResult,
) -> Result<ContainerId, StepFailure> {
    let container_id = driver
        .create_container(analysis)
        .await
        .map_err(|e| {
            StepFailure::retryable(VibeError::ExecutionFailed {
                exit_code: 1,
                detail: e.to_string(),
            })
        })?;

    if let Err(e) = driver.copy_files(&container_id, files).await {
        driver.remove_container(&container_id).await;
        return Err(StepFailure::retryable(VibeError::ExecutionFailed {
            exit_code: 1,
            detail: e.to_string(),
        }));
    }

    match install_with_repair(driver, lm, &container_id, analysis).await {
        Ok(result) if result.success => Ok(container_id),
        Ok(_) => {
            driver.remove_container(&container_id).await;
            Err(StepFailure::retryable(VibeError::RetryExhausted(RetryBudget::SetupFailed)))
        }
        Err(e) => {
            driver.remove_container(&container_id).await;
            Err(e)
        }
    }
}

/// Runs the whole setup pipeline for a freshly uploaded project.
pub async fn run_setup(
    files: HashMap<String, String>,
    driver: &dyn SandboxDriver,
    lm: &dyn LmClient,
    tokens_limit: u32,
) -> Result<SetupOutcome, VibeError> {
    info!(stage = ?Stage::Analyze, file_count = files.len(), "starting setup pipeline");
    let (mut analysis, context) = analyze_project(&files, lm, tokens_limit).await?;

    let mut container_id = None;
    for attempt in 1..=MAX_CONTAINER_ATTEMPTS {
        info!(stage = ?Stage::CreateContainer, attempt, "attempting container setup");
        match run_container_attempt(driver, lm, &files, &mut analysis).await {
            Ok(id) => {
                container_id = Some(id);
                break;
            }
            Err(failure) if failure.permanent => return Err(failure.error),
            Err(failure) if attempt < MAX_CONTAINER_ATTEMPTS => {
                warn!(attempt, error = %failure.error, "container setup attempt failed, retrying");
                backoff(attempt).await;
            }
            Err(failure) => return Err(failure.error),
        }
    }
    let container_id = container_id.ok_or(VibeError::RetryExhausted(RetryBudget::SetupFailed))?;

    info!(stage = ?Stage::GenerateTestCommand, "selecting test command");
    let test_command = select_test_command(&analysis);

    info!(stage = ?Stage::Ready, %container_id, "setup complete");
    Ok(SetupOutcome {
        container_id,
        analysis,
        context,
        test_command,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use vibe_llm::MockLmClient;
    use vibe_sandbox::MockSandboxDriver;

    fn combined_response(install_ok: bool) -> String {
        let install = if install_ok {
            "[]"
        } else {
            "[\"pip install -r requirements.txt\"]"
        };
        format!(
            r#"{{
                "analysis": {{
                    "language": "Python",
                    "docker_image": "python:3.12-slim",
                    "install_commands": {install},
                    "commands": ["python -m py_compile main.py"],
                    "test_commands": ["pytest"],
                    "working_dir": "/workspace",
                    "dependencies": [],
                    "reasoning": "r"
                }},
                "context": {{
                    "project_name": "demo",
                    "language": "Python",
                    "description": "demo",
                    "dependencies": [],
                    "structure": {{"directories": [], "file_types": {{}}}}
                }}
            }}"#
        )
    }

    #[tokio::test]
    async fn happy_path_reaches_ready() {
        let lm = MockLmClient::with_responses([combined_response(true)]);
        let driver = MockSandboxDriver::new();
        let mut files = HashMap::new();
        files.insert("main.py".to_string(), "print(1)".to_string());

        let outcome = run_setup(files, &driver, &lm, 8000).await.unwrap();
        assert_eq!(outcome.test_command, "pytest");
        assert_eq!(outcome.analysis.language, "Python");
    }

    #[tokio::test]
    async fn missing_test_commands_falls_back_to_sentinel() {
        let combined = r#"{
            "analysis": {
                "language": "Python",
                "docker_image": "python:3.12-slim",
                "install_commands": [],
                "commands": [],
                "test_commands": [],
                "working_dir": "/workspace",
                "dependencies": [],
                "reasoning": "r"
            },
            "context": {
                "project_name": "demo",
                "language": "Python",
                "description": "demo",
                "dependencies": [],
                "structure": {"directories": [], "file_types": {}}
            }
        }"#;
        let lm = MockLmClient::with_responses([combined]);
        let driver = MockSandboxDriver::new();
        let outcome = run_setup(HashMap::new(), &driver, &lm, 8000).await.unwrap();
        assert_eq!(
            outcome.test_command,
            crate::test_command::NO_TEST_COMMAND_SENTINEL
        );
    }

    /// Delegates everything to [`MockSandboxDriver`] except
    /// `install_dependencies`, which fails unconditionally so the repair
    /// sub-protocol is always exercised.
    struct AlwaysFailInstallDriver {
        inner: MockSandboxDriver,
    }

    #[async_trait::async_trait]
    impl SandboxDriver for AlwaysFailInstallDriver {
        async fn create_container(
            &self,
            analysis: &CodeAnalysisResult,
        ) -> Result<ContainerId, vibe_sandbox::SandboxError> {
            self.inner.create_container(analysis).await
        }

        async fn copy_files(
            &self,
            container_id: &str,
            files: &HashMap<String, String>,
        ) -> Result<(), vibe_sandbox::SandboxError> {
            self.inner.copy_files(container_id, files).await
        }

        async fn install_dependencies(
            &self,
            _container_id: &str,
            _analysis: &CodeAnalysisResult,
        ) -> Result<ValidationResult, vibe_sandbox::SandboxError> {
            Ok(ValidationResult::failed(
                "pip: no matching distribution".to_string(),
                1,
                Duration::ZERO,
            ))
        }

        async fn execute(
            &self,
            container_id: &str,
            command: &str,
        ) -> Result<ValidationResult, vibe_sandbox::SandboxError> {
            self.inner.execute(container_id, command).await
        }

        async fn validate(
            &self,
            container_id: &str,
            analysis: &CodeAnalysisResult,
        ) -> Result<ValidationResult, vibe_sandbox::SandboxError> {
            self.inner.validate(container_id, analysis).await
        }

        async fn remove_container(&self, container_id: &str) {
            self.inner.remove_container(container_id).await
        }
    }

    #[tokio::test]
    async fn retry_recommended_false_fails_setup_permanently_without_exhausting_attempts() {
        let combined = combined_response(true);
        let repair_patch = r#"{
            "root_cause": "project requires a platform this sandbox cannot provide",
            "retry_recommended": false,
            "reasoning": "unfixable"
        }"#;
        // Only one combined-analysis response and one repair response are
        // queued: if the pipeline kept burning container/install attempts
        // after the permanent failure it would call the LM again and the
        // mock would panic on an empty queue.
        let lm = MockLmClient::with_responses([combined, repair_patch.to_string()]);
        let driver = AlwaysFailInstallDriver {
            inner: MockSandboxDriver::new(),
        };
        let mut files = HashMap::new();
        files.insert("main.py".to_string(), "print(1)".to_string());

        let err = run_setup(files, &driver, &lm, 8000).await.unwrap_err();
        assert!(matches!(
            err,
            VibeError::RetryExhausted(RetryBudget::SetupFailed)
        ));
    }
}
