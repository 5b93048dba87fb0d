//! The Sandbox Driver Interface.

use async_trait::async_trait;
use std::collections::HashMap;
use vibe_core::{CodeAnalysisResult, ValidationResult};

/// Opaque handle returned by [`SandboxDriver::create_container`].
pub type ContainerId = String;

#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    #[error("sandbox driver unavailable")]
    Unavailable,
    #[error("failed to pull image '{0}'")]
    ImagePullFailed(String),
    #[error("container not found: {0}")]
    NotFound(String),
    #[error("io error: {0}")]
    IoError(String),
    #[error("internal sandbox error: {0}")]
    Internal(String),
}

/// Abstract container create/copy/install/exec/remove.
///
/// All operations take a cancellable context via `tokio_util::sync::CancellationToken`
/// would be the natural shape, but every call here is already bounded by the
/// caller's own timeout/retry budget (Setup Pipeline, Session), so the trait
/// keeps signatures plain and lets callers wrap with `tokio::select!` against
/// their own cancellation signal -- mirroring how `csa_process::spawn_tool`
/// leaves cancellation to its caller rather than baking it into the spawn call.
#[async_trait]
pub trait SandboxDriver: Send + Sync {
    async fn create_container(&self, analysis: &CodeAnalysisResult) -> Result<ContainerId, SandboxError>;

    /// `path -> content`. Destination is `analysis.working_dir`; collisions overwrite.
    async fn copy_files(
        &self,
        container_id: &str,
        files: &HashMap<String, String>,
    ) -> Result<(), SandboxError>;

    async fn install_dependencies(
        &self,
        container_id: &str,
        analysis: &CodeAnalysisResult,
    ) -> Result<ValidationResult, SandboxError>;

    async fn execute(&self, container_id: &str, command: &str) -> Result<ValidationResult, SandboxError>;

    async fn validate(
        &self,
        container_id: &str,
        analysis: &CodeAnalysisResult,
    ) -> Result<ValidationResult, SandboxError>;

    /// Idempotent; never fails loudly on "already gone".
    async fn remove_container(&self, container_id: &str);
}
