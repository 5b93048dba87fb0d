//! The language-model provider seam.
//!
//! The chat front-end and the concrete LM provider clients are external
//! collaborators; this crate only defines the trait boundary
//! every internal component calls through, plus a scriptable mock used by
//! tests of the components that sit above it (C3, C8, C9, C10).

use async_trait::async_trait;
use std::collections::VecDeque;
use tokio::sync::Mutex;

/// A single turn sent to the LM: a system prompt and a user payload.
#[derive(Debug, Clone)]
pub struct LmRequest {
    pub system_prompt: String,
    pub user_prompt: String,
}

impl LmRequest {
    pub fn new(system_prompt: impl Into<String>, user_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
        }
    }
}

/// Generative text completion. Implementations talk to whatever provider
/// transport lives outside the core; the core only needs raw
/// text back, since every response shape in this workspace is framed as
/// JSON by the caller (C8) rather than by the client.
#[async_trait]
pub trait LmClient: Send + Sync {
    async fn complete(&self, request: LmRequest) -> anyhow::Result<String>;
}

/// Deterministic, queue-driven [`LmClient`] for tests and offline operation.
///
/// Each call to [`MockLmClient::push`] enqueues one canned response; calls
/// to [`LmClient::complete`] dequeue in FIFO order. Calling past the queue
/// returns an error so tests fail loudly on an unexpected extra call.
pub struct MockLmClient {
    responses: Mutex<VecDeque<String>>,
}

impl MockLmClient {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
        }
    }

    pub fn with_responses<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: Mutex::new(responses.into_iter().map(Into::into).collect()),
        }
    }

    pub fn push(&self, response: impl Into<String>) {
        // try_lock is safe here: the mutex is never held across an await point,
        // so it can't be contended when a caller on the same task calls push().
        self.responses
            .try_lock()
            .expect("MockLmClient mutex is never held across an await")
            .push_back(response.into());
    }
}

impl Default for MockLmClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LmClient for MockLmClient {
    async fn complete(&self, _request: LmRequest) -> anyhow::Result<String> {
        self.responses
            .lock()
            .await
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("MockLmClient: no queued response left"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_dequeues_in_order() {
        let client = MockLmClient::with_responses(["one", "two"]);
        let first = client
            .complete(LmRequest::new("sys", "usr"))
            .await
            .unwrap();
        let second = client
            .complete(LmRequest::new("sys", "usr"))
            .await
            .unwrap();
        assert_eq!(first, "one");
        assert_eq!(second, "two");
    }

    #[tokio::test]
    async fn mock_errors_when_exhausted() {
        let client = MockLmClient::new();
        assert!(client.complete(LmRequest::new("s", "u")).await.is_err());
    }
}
