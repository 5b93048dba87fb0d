//! Real [`SandboxDriver`] backed by the `docker` CLI.
//!
//! Shells out rather than linking a container-engine client library,
//! spawning well-known binaries the same way `csa_process::spawn_tool` does,
//! rather than vendoring a heavy client.

use crate::driver::{ContainerId, SandboxDriver, SandboxError};
use crate::exec::run_shell_command;
use async_trait::async_trait;
use std::collections::HashMap;
use std::io::Write;
use std::process::Stdio;
use tempfile::NamedTempFile;
use tokio::process::Command;
use tracing::{info, warn};
use vibe_core::{CodeAnalysisResult, ValidationResult};

pub struct DockerSandboxDriver {
    docker_bin: String,
}

impl DockerSandboxDriver {
    pub fn new() -> Self {
        Self {
            docker_bin: std::env::var("VIBE_DOCKER_BIN").unwrap_or_else(|_| "docker".to_string()),
        }
    }

    fn exec_cmd(&self, container_id: &str, command: &str, working_dir: &str) -> Command {
        let mut cmd = Command::new(&self.docker_bin);
        cmd.args(["exec", "-w", working_dir, container_id, "sh", "-c", command]);
        cmd
    }
}

impl Default for DockerSandboxDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SandboxDriver for DockerSandboxDriver {
    async fn create_container(&self, analysis: &CodeAnalysisResult) -> Result<ContainerId, SandboxError> {
        let mut cmd = Command::new(&self.docker_bin);
        cmd.args(["create", "-i", &analysis.docker_image, "sleep", "infinity"]);
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        let output = cmd
            .output()
            .await
            .map_err(|e| SandboxError::Internal(e.to_string()))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SandboxError::ImagePullFailed(format!(
                "{}: {stderr}",
                analysis.docker_image
            )));
        }
        let id = String::from_utf8_lossy(&output.stdout).trim().to_string();

        let mut start_cmd = Command::new(&self.docker_bin);
        start_cmd.args(["start", &id]);
        let start_output = start_cmd
            .output()
            .await
            .map_err(|e| SandboxError::Internal(e.to_string()))?;
        if !start_output.status.success() {
            return Err(SandboxError::Internal(
                String::from_utf8_lossy(&start_output.stderr).to_string(),
            ));
        }

        info!(container_id = %id, image = %analysis.docker_image, "container created");
        Ok(id)
    }

    async fn copy_files(
        &self,
        container_id: &str,
        files: &HashMap<String, String>,
    ) -> Result<(), SandboxError> {
        for (path, content) in files {
            let mut tmp = NamedTempFile::new().map_err(|e| SandboxError::IoError(e.to_string()))?;
            tmp.write_all(content.as_bytes())
                .map_err(|e| SandboxError::IoError(e.to_string()))?;
            tmp.flush().map_err(|e| SandboxError::IoError(e.to_string()))?;

            let mkdir_cmd = format!("mkdir -p \"$(dirname '{path}')\"");
            let dest = format!("{container_id}:{path}");

            let mut mkdir = Command::new(&self.docker_bin);
            mkdir.args(["exec", container_id, "sh", "-c", &mkdir_cmd]);
            mkdir
                .output()
                .await
                .map_err(|e| SandboxError::IoError(e.to_string()))?;

            let mut cp = Command::new(&self.docker_bin);
            cp.args(["cp", &tmp.path().to_string_lossy(), &dest]);
            let cp_output = cp
                .output()
                .await
                .map_err(|e| SandboxError::IoError(e.to_string()))?;
            if !cp_output.status.success() {
                return Err(SandboxError::IoError(format!(
                    "copy of '{path}' failed: {}",
                    String::from_utf8_lossy(&cp_output.stderr)
                )));
            }
        }

        // Verify every listed path exists after copy, as requires.
        for path in files.keys() {
            let check = format!("test -e '{path}'");
            let mut cmd = Command::new(&self.docker_bin);
            cmd.args(["exec", container_id, "sh", "-c", &check]);
            let status = cmd
                .status()
                .await
                .map_err(|e| SandboxError::IoError(e.to_string()))?;
            if !status.success() {
                return Err(SandboxError::NotFound(path.clone()));
            }
        }

        Ok(())
    }

    async fn install_dependencies(
        &self,
        container_id: &str,
        analysis: &CodeAnalysisResult,
    ) -> Result<ValidationResult, SandboxError> {
        let mut combined_output = String::new();
        for command in &analysis.install_commands {
            let result = run_shell_command(self.exec_cmd(container_id, command, &analysis.working_dir))
                .await
                .map_err(|e| SandboxError::Internal(e.to_string()))?;
            combined_output.push_str(&result.output);
            combined_output.push('\n');
            if !result.success {
                return Ok(ValidationResult::failed(
                    combined_output,
                    result.exit_code,
                    result.duration,
                ));
            }
        }
        Ok(ValidationResult::ok(combined_output, std::time::Duration::ZERO))
    }

    async fn execute(&self, container_id: &str, command: &str) -> Result<ValidationResult, SandboxError> {
        // working_dir unknown at this call site; default to container's default shell cwd.
        run_shell_command(self.exec_cmd(container_id, command, "."))
            .await
            .map_err(|e| SandboxError::Internal(e.to_string()))
    }

    async fn validate(
        &self,
        container_id: &str,
        analysis: &CodeAnalysisResult,
    ) -> Result<ValidationResult, SandboxError> {
        let mut combined_output = String::new();
        let mut overall_success = true;
        let mut last_exit = 0;
        let started = std::time::Instant::now();
        for command in &analysis.commands {
            let result = run_shell_command(self.exec_cmd(container_id, command, &analysis.working_dir))
                .await
                .map_err(|e| SandboxError::Internal(e.to_string()))?;
            combined_output.push_str(&result.output);
            combined_output.push('\n');
            if !result.success {
                overall_success = false;
                last_exit = result.exit_code;
            }
        }
        Ok(ValidationResult {
            success: overall_success,
            output: combined_output,
            exit_code: last_exit,
            duration: started.elapsed(),
            ..Default::default()
        })
    }

    async fn remove_container(&self, container_id: &str) {
        let mut cmd = Command::new(&self.docker_bin);
        cmd.args(["rm", "-f", container_id]);
        if let Err(e) = cmd.status().await {
            warn!(container_id, error = %e, "failed to remove container (ignored, idempotent)");
        }
    }
}
