//! Data model shared by every orchestration component.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Key of the Session Manager's registry; stable across the lifetime of a session.
pub type UserId = String;

/// Produced by the Analysis + Context Generator (C3).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CodeAnalysisResult {
    pub language: String,
    #[serde(default)]
    pub framework: Option<String>,
    pub docker_image: String,
    #[serde(default)]
    pub install_commands: Vec<String>,
    #[serde(default)]
    pub commands: Vec<String>,
    #[serde(default)]
    pub test_commands: Vec<String>,
    pub working_dir: String,
    #[serde(default)]
    pub project_type: Option<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub reasoning: String,
}

/// A single file's LM-generated summary, tracked inside [`ProjectContext`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileContext {
    pub path: String,
    #[serde(rename = "type")]
    pub file_type: String,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
    pub summary: String,
    #[serde(default)]
    pub key_elements: Vec<String>,
    pub purpose: String,
    #[serde(default)]
    pub dependencies: Vec<String>,
    pub tokens_used: u32,
    pub needs_update: bool,
}

/// Directory/file-type breakdown of the project, as surfaced in [`ProjectContext`].
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProjectStructure {
    #[serde(default)]
    pub directories: Vec<String>,
    #[serde(default)]
    pub file_types: HashMap<String, u32>,
}

/// Token-budgeted, LM-generated summary of the project and its files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectContext {
    pub project_name: String,
    pub language: String,
    pub generated_at: DateTime<Utc>,
    pub total_files: u32,
    /// Invariant: at most 100 characters.
    pub description: String,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub files: HashMap<String, FileContext>,
    #[serde(default)]
    pub structure: ProjectStructure,
    pub tokens_used: u32,
    pub tokens_limit: u32,
}

impl ProjectContext {
    /// Invariant I4: `sum(files[*].tokens_used) + overhead <= tokens_limit`.
    pub fn recompute_tokens_used(&mut self, overhead: u32) {
        let files_total: u32 = self.files.values().map(|f| f.tokens_used).sum();
        self.tokens_used = files_total + overhead;
    }

    pub fn is_within_budget(&self) -> bool {
        self.tokens_used <= self.tokens_limit
    }
}

/// Returned by sandbox `execute`/`validate` and by Session `execute_command`/`validate_code`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ValidationResult {
    pub success: bool,
    pub output: String,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
    pub exit_code: i32,
    pub duration: std::time::Duration,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub user_question: Option<String>,
    #[serde(default)]
    pub question_answer: Option<String>,
    #[serde(default)]
    pub error_analysis: Option<String>,
    #[serde(default)]
    pub retry_attempt: u32,
    #[serde(default)]
    pub build_problems: Vec<String>,
    #[serde(default)]
    pub code_problems: Vec<String>,
}

impl ValidationResult {
    pub fn ok(output: impl Into<String>, duration: std::time::Duration) -> Self {
        Self {
            success: true,
            output: output.into(),
            exit_code: 0,
            duration,
            ..Default::default()
        }
    }

    pub fn failed(output: impl Into<String>, exit_code: i32, duration: std::time::Duration) -> Self {
        Self {
            success: false,
            output: output.into(),
            exit_code,
            duration,
            ..Default::default()
        }
    }
}

/// Category of a problem found in a generated test file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestIssueType {
    SyntaxError,
    ExecutionError,
    MissingDependency,
    InvalidReference,
    ConfigurationError,
    TestFailure,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestIssue {
    pub filename: String,
    #[serde(rename = "type")]
    pub issue_type: TestIssueType,
    pub description: String,
    #[serde(default)]
    pub line: Option<u32>,
}
