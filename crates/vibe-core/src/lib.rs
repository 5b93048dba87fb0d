//! Shared types and error kinds for the VibeCoding session orchestration core.

pub mod error;
pub mod types;

pub use error::{RetryBudget, VibeError};
pub use types::{
    CodeAnalysisResult, FileContext, ProjectContext, ProjectStructure, TestIssue, TestIssueType,
    UserId, ValidationResult,
};
