//! Session CRUD: one active session per user.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use vibe_core::{UserId, VibeError};
use vibe_llm::LmClient;
use vibe_sandbox::SandboxDriver;

use crate::session::Session;

/// Registry of active sessions, keyed by user. Sessions live only in memory:
/// restarting the process drops every session, matching the orchestrator's
/// no-cross-restart-persistence policy.
pub struct SessionManager {
    sessions: RwLock<HashMap<UserId, Arc<Session>>>,
    driver: Arc<dyn SandboxDriver>,
    lm: Arc<dyn LmClient>,
}

impl SessionManager {
    pub fn new(driver: Arc<dyn SandboxDriver>, lm: Arc<dyn LmClient>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            driver,
            lm,
        }
    }

    /// Creates a new session for `user_id`. Fails with [`VibeError::AlreadyExists`]
    /// if that user already has one; the caller must [`SessionManager::end`] it first.
    pub async fn create(
        &self,
        user_id: UserId,
        files: HashMap<String, String>,
    ) -> Result<Arc<Session>, VibeError> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&user_id) {
            return Err(VibeError::AlreadyExists(user_id));
        }
        let session = Session::new(
            user_id.clone(),
            files,
            Arc::clone(&self.driver),
            Arc::clone(&self.lm),
        );
        sessions.insert(user_id, Arc::clone(&session));
        Ok(session)
    }

    pub async fn get(&self, user_id: &str) -> Result<Arc<Session>, VibeError> {
        self.sessions
            .read()
            .await
            .get(user_id)
            .cloned()
            .ok_or_else(|| VibeError::not_found(user_id))
    }

    /// Tears down a session: removes its container (idempotent, best-effort)
    /// and drops it from the registry.
    pub async fn end(&self, user_id: &str) -> Result<(), VibeError> {
        let session = {
            let mut sessions = self.sessions.write().await;
            sessions.remove(user_id)
        }
        .ok_or_else(|| VibeError::not_found(user_id))?;

        if let Some(container_id) = session.container_id().await {
            self.driver.remove_container(&container_id).await;
        }
        Ok(())
    }

    pub async fn active_user_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
