//! A single user's sandboxed coding session.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use vibe_analysis::{add_file_context, mark_needs_update, metadata_overhead_tokens, regenerate_file_context};
use vibe_core::{CodeAnalysisResult, ProjectContext, UserId, ValidationResult, VibeError};
use vibe_llm::LmClient;
use vibe_sandbox::{ContainerId, SandboxDriver};

/// Read-only snapshot returned by [`Session::get_info`].
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub user_id: UserId,
    pub container_id: Option<ContainerId>,
    pub ready: bool,
    pub analysis: Option<CodeAnalysisResult>,
    pub test_command: Option<String>,
    pub file_count: usize,
    pub generated_file_count: usize,
    pub created_at: DateTime<Utc>,
}

pub struct Session {
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    files: RwLock<HashMap<String, String>>,
    generated_files: RwLock<HashMap<String, String>>,
    container_id: RwLock<Option<ContainerId>>,
    analysis: RwLock<Option<CodeAnalysisResult>>,
    context: RwLock<Option<ProjectContext>>,
    test_command: RwLock<Option<String>>,
    ready: AtomicBool,
    driver: Arc<dyn SandboxDriver>,
    lm: Arc<dyn LmClient>,
}

impl Session {
    pub fn new(
        user_id: UserId,
        files: HashMap<String, String>,
        driver: Arc<dyn SandboxDriver>,
        lm: Arc<dyn LmClient>,
    ) -> Arc<Self> {
        Arc::new(Self {
            user_id,
            created_at: Utc::now(),
            files: RwLock::new(files),
            generated_files: RwLock::new(HashMap::new()),
            container_id: RwLock::new(None),
            analysis: RwLock::new(None),
            context: RwLock::new(None),
            test_command: RwLock::new(None),
            ready: AtomicBool::new(false),
            driver,
            lm,
        })
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    fn require_ready(&self) -> Result<(), VibeError> {
        if self.is_ready() {
            Ok(())
        } else {
            Err(VibeError::NotReady(self.user_id.clone()))
        }
    }

    /// Used by the setup pipeline once all stages succeed.
    pub async fn mark_ready(
        &self,
        container_id: ContainerId,
        analysis: CodeAnalysisResult,
        context: ProjectContext,
        test_command: String,
    ) {
        *self.container_id.write().await = Some(container_id);
        *self.analysis.write().await = Some(analysis);
        *self.context.write().await = Some(context);
        *self.test_command.write().await = Some(test_command);
        self.ready.store(true, Ordering::Release);
    }

    pub async fn container_id(&self) -> Option<ContainerId> {
        self.container_id.read().await.clone()
    }

    pub async fn analysis(&self) -> Option<CodeAnalysisResult> {
        self.analysis.read().await.clone()
    }

    pub async fn context(&self) -> Option<ProjectContext> {
        self.context.read().await.clone()
    }

    pub async fn test_command(&self) -> Option<String> {
        self.test_command.read().await.clone()
    }

    pub async fn original_files(&self) -> HashMap<String, String> {
        self.files.read().await.clone()
    }

    pub async fn generated_files(&self) -> HashMap<String, String> {
        self.generated_files.read().await.clone()
    }

    /// Lists every known path. Paths present in both the original upload and
    /// the generated overlay appear once.
    pub async fn list_files(&self) -> Vec<String> {
        let files = self.files.read().await;
        let generated = self.generated_files.read().await;
        let mut paths: Vec<String> = files.keys().chain(generated.keys()).cloned().collect();
        paths.sort();
        paths.dedup();
        paths
    }

    /// Reads a single file. The generated overlay wins when a path exists in
    /// both maps.
    pub async fn read_file(&self, path: &str) -> Result<String, VibeError> {
        if let Some(content) = self.generated_files.read().await.get(path) {
            return Ok(content.clone());
        }
        if let Some(content) = self.files.read().await.get(path) {
            return Ok(content.clone());
        }
        Err(VibeError::not_found(path))
    }

    async fn write_into(self: &Arc<Self>, path: &str, content: String, generated: bool) {
        if generated {
            self.generated_files.write().await.insert(path.to_string(), content);
        } else {
            self.files.write().await.insert(path.to_string(), content);
        }

        let has_context = self.context.read().await.is_some();
        if has_context {
            {
                let mut ctx_guard = self.context.write().await;
                if let Some(ctx) = ctx_guard.as_mut() {
                    mark_needs_update(ctx, path);
                }
            }
            self.spawn_context_refresh(path.to_string());
        }
    }

    /// Writes (or overwrites) a file, then asynchronously refreshes that
    /// file's context entry in the background.
    pub async fn write_file(self: &Arc<Self>, path: &str, content: String, generated: bool) {
        self.write_into(path, content, generated).await;
    }

    pub async fn add_generated_file(self: &Arc<Self>, path: &str, content: String) {
        self.write_into(path, content, true).await;
    }

    pub async fn remove_file(&self, path: &str) {
        self.files.write().await.remove(path);
        self.generated_files.write().await.remove(path);
        let mut ctx_guard = self.context.write().await;
        if let Some(ctx) = ctx_guard.as_mut() {
            ctx.files.remove(path);
            let overhead = metadata_overhead_tokens();
            ctx.recompute_tokens_used(overhead);
        }
    }

    fn spawn_context_refresh(self: &Arc<Self>, path: String) {
        let session = Arc::clone(self);
        tokio::spawn(async move {
            let content = match session.read_file(&path).await {
                Ok(c) => c,
                Err(_) => return,
            };
            let remaining = {
                let ctx_guard = session.context.read().await;
                match ctx_guard.as_ref() {
                    Some(ctx) => ctx.tokens_limit.saturating_sub(ctx.tokens_used),
                    None => return,
                }
            };
            match regenerate_file_context(&path, &content, remaining, session.lm.as_ref()).await {
                Ok(fc) => {
                    let mut ctx_guard = session.context.write().await;
                    if let Some(ctx) = ctx_guard.as_mut() {
                        let overhead = metadata_overhead_tokens();
                        add_file_context(ctx, overhead, fc);
                    }
                }
                Err(e) => {
                    tracing::warn!(path = %path, error = %e, "background context refresh failed");
                }
            }
        });
    }

    /// Forces an immediate (non-backgrounded) refresh of every entry flagged
    /// stale, clearing the flag on success.
    pub async fn refresh_context(self: &Arc<Self>) -> Result<(), VibeError> {
        let stale: Vec<String> = {
            let ctx_guard = self.context.read().await;
            match ctx_guard.as_ref() {
                Some(ctx) => ctx
                    .files
                    .values()
                    .filter(|fc| fc.needs_update)
                    .map(|fc| fc.path.clone())
                    .collect(),
                None => return Ok(()),
            }
        };
        for path in stale {
            let content = self.read_file(&path).await?;
            let remaining = {
                let ctx_guard = self.context.read().await;
                let ctx = ctx_guard.as_ref().unwrap();
                ctx.tokens_limit.saturating_sub(ctx.tokens_used)
            };
            let fc = regenerate_file_context(&path, &content, remaining, self.lm.as_ref())
                .await
                .map_err(|e| VibeError::ParseError(e.to_string()))?;
            let mut ctx_guard = self.context.write().await;
            if let Some(ctx) = ctx_guard.as_mut() {
                let overhead = metadata_overhead_tokens();
                add_file_context(ctx, overhead, fc);
            }
        }
        Ok(())
    }

    pub async fn execute_command(&self, command: &str) -> Result<ValidationResult, VibeError> {
        self.require_ready()?;
        let container_id = self.container_id().await.ok_or(VibeError::Unavailable)?;
        self.driver
            .execute(&container_id, command)
            .await
            .map_err(|e| VibeError::ExecutionFailed {
                exit_code: 1,
                detail: e.to_string(),
            })
    }

    pub async fn validate_code(&self) -> Result<ValidationResult, VibeError> {
        self.require_ready()?;
        let container_id = self.container_id().await.ok_or(VibeError::Unavailable)?;
        let analysis = self.analysis().await.ok_or(VibeError::Unavailable)?;
        self.driver
            .validate(&container_id, &analysis)
            .await
            .map_err(|e| VibeError::ExecutionFailed {
                exit_code: 1,
                detail: e.to_string(),
            })
    }

    /// Validates a single file by running the project's first validation
    /// command scoped to it, rather than the whole-project `validate_code`.
    pub async fn validate_file(&self, filename: &str) -> Result<ValidationResult, VibeError> {
        self.require_ready()?;
        let container_id = self.container_id().await.ok_or(VibeError::Unavailable)?;
        let analysis = self.analysis().await.ok_or(VibeError::Unavailable)?;
        let command = analysis
            .commands
            .first()
            .map(|c| format!("{c} {filename}"))
            .unwrap_or_else(|| filename.to_string());
        self.driver
            .execute(&container_id, &command)
            .await
            .map_err(|e| VibeError::ExecutionFailed {
                exit_code: 1,
                detail: e.to_string(),
            })
    }

    /// Runs the full generate/review/execute/fix loop (C10) against this
    /// session's container and known test commands. `test_file`, if given,
    /// is folded into the generation request rather than filtering the
    /// result: the LM is free to generate whatever files the task needs.
    /// Files that end up passing are folded into the generated overlay.
    pub async fn generate_and_validate_tests(
        self: &Arc<Self>,
        query: &str,
        test_file: Option<&str>,
    ) -> Result<vibe_testgen::TestGenerationOutcome, VibeError> {
        self.require_ready()?;
        let container_id = self.container_id().await.ok_or(VibeError::Unavailable)?;
        let analysis = self.analysis().await.ok_or(VibeError::Unavailable)?;
        let description = self
            .context()
            .await
            .map(|ctx| ctx.description)
            .unwrap_or_default();
        let effective_query = match test_file {
            Some(file) if query.trim().is_empty() => format!("Write or fix tests for {file}"),
            Some(file) => format!("{query}\nFocus on the test file: {file}"),
            None => query.to_string(),
        };

        let outcome = vibe_testgen::generate_and_validate(
            &analysis.language,
            &description,
            &effective_query,
            &container_id,
            &analysis.test_commands,
            self.driver.as_ref(),
            self.lm.as_ref(),
        )
        .await?;

        for (path, content) in &outcome.code {
            self.write_into(path, content.clone(), true).await;
        }
        Ok(outcome)
    }

    pub async fn get_info(&self) -> SessionInfo {
        SessionInfo {
            user_id: self.user_id.clone(),
            container_id: self.container_id().await,
            ready: self.is_ready(),
            analysis: self.analysis().await,
            test_command: self.test_command().await,
            file_count: self.files.read().await.len(),
            generated_file_count: self.generated_files.read().await.len(),
            created_at: self.created_at,
        }
    }
}
