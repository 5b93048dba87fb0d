//! Request/response envelope shapes for the LM protocol.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// The high-level operation an LM call is being asked to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LmAction {
    AnswerQuestion,
    GenerateCode,
    Analyze,
    AutonomousWork,
    AnalyzeError,
}

/// `{action, context, query, options?}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LmRequestEnvelope {
    pub action: LmAction,
    pub context: String,
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Success,
    Error,
    Partial,
}

/// `{status, response, code?, suggestions?, error?, metadata?}`.
///
/// Unknown top-level keys are intentionally allowed and ignored: this type
/// does not derive `deny_unknown_fields`, matching "Unknown
/// top-level keys are allowed and ignored."
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LmResponseEnvelope {
    pub status: ResponseStatus,
    #[serde(default)]
    pub response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<HashMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

/// Checks the cross-field rules layers on top of plain JSON
/// schema validity: `success` requires non-empty `response`; `error`
/// requires non-empty `error`.
pub fn validate_envelope(envelope: &LmResponseEnvelope) -> Result<(), String> {
    match envelope.status {
        ResponseStatus::Success => {
            if envelope.response.trim().is_empty() {
                return Err("status=success requires a non-empty response".to_string());
            }
        }
        ResponseStatus::Error => {
            if envelope.error.as_deref().unwrap_or("").trim().is_empty() {
                return Err("status=error requires a non-empty error".to_string());
            }
        }
        ResponseStatus::Partial => {}
    }
    Ok(())
}
