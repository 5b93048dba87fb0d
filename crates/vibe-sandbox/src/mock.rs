//! In-memory [`SandboxDriver`] for offline operation and tests.

use crate::driver::{ContainerId, SandboxDriver, SandboxError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use vibe_core::{CodeAnalysisResult, ValidationResult};

const MOCK_WARNING: &str = "mock sandbox driver active: no real container was created";

#[derive(Default)]
struct MockContainer {
    files: HashMap<String, String>,
}

/// Always succeeds; surfaces [`MOCK_WARNING`] in every [`ValidationResult::suggestions`].
pub struct MockSandboxDriver {
    next_id: AtomicU64,
    containers: Mutex<HashMap<String, MockContainer>>,
}

impl MockSandboxDriver {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            containers: Mutex::new(HashMap::new()),
        }
    }

    fn warned_result(output: impl Into<String>) -> ValidationResult {
        ValidationResult {
            suggestions: vec![MOCK_WARNING.to_string()],
            ..ValidationResult::ok(output, std::time::Duration::ZERO)
        }
    }
}

impl Default for MockSandboxDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SandboxDriver for MockSandboxDriver {
    async fn create_container(&self, _analysis: &CodeAnalysisResult) -> Result<ContainerId, SandboxError> {
        let id = format!("mock-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.containers.lock().await.insert(id.clone(), MockContainer::default());
        Ok(id)
    }

    async fn copy_files(
        &self,
        container_id: &str,
        files: &HashMap<String, String>,
    ) -> Result<(), SandboxError> {
        let mut containers = self.containers.lock().await;
        let container = containers
            .get_mut(container_id)
            .ok_or_else(|| SandboxError::NotFound(container_id.to_string()))?;
        container.files.extend(files.clone());
        Ok(())
    }

    async fn install_dependencies(
        &self,
        _container_id: &str,
        _analysis: &CodeAnalysisResult,
    ) -> Result<ValidationResult, SandboxError> {
        Ok(Self::warned_result("mock install: no-op"))
    }

    async fn execute(&self, _container_id: &str, command: &str) -> Result<ValidationResult, SandboxError> {
        Ok(Self::warned_result(format!("mock exec: {command}")))
    }

    async fn validate(
        &self,
        _container_id: &str,
        _analysis: &CodeAnalysisResult,
    ) -> Result<ValidationResult, SandboxError> {
        Ok(Self::warned_result("mock validate: assumed success"))
    }

    async fn remove_container(&self, container_id: &str) {
        self.containers.lock().await.remove(container_id);
    }
}
