//! Picks the sandbox driver once at process startup: real Docker when the
//! CLI is present, otherwise the in-memory mock.

use std::sync::Arc;

use vibe_sandbox::{DockerSandboxDriver, MockSandboxDriver, SandboxDriver};

pub fn select_driver() -> (Arc<dyn SandboxDriver>, &'static str) {
    if which::which("docker").is_ok() {
        (Arc::new(DockerSandboxDriver::new()), "docker")
    } else {
        (Arc::new(MockSandboxDriver::new()), "mock")
    }
}
