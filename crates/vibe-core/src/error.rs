//! Abstract error kinds shared across the orchestration core.

/// Bounded-retry budgets that, once exhausted, surface as [`VibeError::RetryExhausted`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryBudget {
    SetupFailed,
    TestValidationExhausted,
    AutonomousStepsExhausted,
    ContainerCreateExhausted,
}

impl std::fmt::Display for RetryBudget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::SetupFailed => "SetupFailed",
            Self::TestValidationExhausted => "TestValidationExhausted",
            Self::AutonomousStepsExhausted => "AutonomousStepsExhausted",
            Self::ContainerCreateExhausted => "ContainerCreateExhausted",
        };
        write!(f, "{s}")
    }
}

#[derive(thiserror::Error, Debug)]
pub enum VibeError {
    #[error("sandbox driver unavailable, falling back to mock")]
    Unavailable,

    #[error("session for user '{0}' is not ready: setup has not completed")]
    NotReady(String),

    #[error("a session already exists for user '{0}'")]
    AlreadyExists(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("LM output was not valid JSON after repair attempts: {0}")]
    ParseError(String),

    #[error("LM response violated the protocol envelope schema: {0}")]
    SchemaInvalid(String),

    #[error("retry budget exhausted: {0}")]
    RetryExhausted(RetryBudget),

    #[error("no usable test command for '{0}'")]
    ConfigurationError(String),

    #[error("execution failed with exit code {exit_code}: {detail}")]
    ExecutionFailed { exit_code: i32, detail: String },

    #[error("operation cancelled")]
    Cancelled,
}

impl VibeError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }
}
