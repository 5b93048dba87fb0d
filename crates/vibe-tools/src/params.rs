//! Argument extraction and coercion shared by every `vibe_*` tool.

use rmcp::ErrorData as McpError;
use serde_json::{Map, Value};

pub fn invalid_params(detail: impl Into<String>) -> McpError {
    McpError::invalid_params(detail.into(), None)
}

fn arguments(args: &Option<Map<String, Value>>) -> Result<&Map<String, Value>, McpError> {
    args.as_ref()
        .ok_or_else(|| invalid_params("missing tool call arguments"))
}

/// Reads `user_id`, accepting a JSON integer, a JSON string, or a
/// decimal-string (`"42"`), and normalizing it all to a plain string.
pub fn require_user_id(args: &Option<Map<String, Value>>) -> Result<String, McpError> {
    let args = arguments(args)?;
    let value = args
        .get("user_id")
        .ok_or_else(|| invalid_params("missing required argument 'user_id'"))?;
    coerce_user_id(value).ok_or_else(|| invalid_params("'user_id' must be a string or integer"))
}

pub fn coerce_user_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub fn require_str<'a>(args: &'a Option<Map<String, Value>>, key: &str) -> Result<&'a str, McpError> {
    arguments(args)?
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| invalid_params(format!("missing or non-string required argument '{key}'")))
}

pub fn optional_bool(args: &Option<Map<String, Value>>, key: &str, default: bool) -> bool {
    args.as_ref()
        .and_then(|a| a.get(key))
        .and_then(Value::as_bool)
        .unwrap_or(default)
}

pub fn optional_str<'a>(args: &'a Option<Map<String, Value>>, key: &str) -> Option<&'a str> {
    args.as_ref().and_then(|a| a.get(key)).and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(v: Value) -> Option<Map<String, Value>> {
        match v {
            Value::Object(m) => Some(m),
            _ => None,
        }
    }

    #[test]
    fn coerces_integer_user_id() {
        let args = map(json!({"user_id": 42}));
        assert_eq!(require_user_id(&args).unwrap(), "42");
    }

    #[test]
    fn coerces_decimal_string_user_id() {
        let args = map(json!({"user_id": "42"}));
        assert_eq!(require_user_id(&args).unwrap(), "42");
    }

    #[test]
    fn missing_user_id_is_invalid_params() {
        let args = map(json!({}));
        assert!(require_user_id(&args).is_err());
    }

    #[test]
    fn missing_arguments_entirely_is_invalid_params() {
        assert!(require_user_id(&None).is_err());
    }

    #[test]
    fn optional_str_absent_is_none() {
        let args = map(json!({"user_id": "1"}));
        assert_eq!(optional_str(&args, "filename"), None);
    }

    #[test]
    fn optional_str_present_is_some() {
        let args = map(json!({"filename": "a.py"}));
        assert_eq!(optional_str(&args, "filename"), Some("a.py"));
    }
}
