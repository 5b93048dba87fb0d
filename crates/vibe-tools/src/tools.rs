//! The seven `vibe_*` tools exposed to the LM over MCP.

use std::sync::Weak;

use rmcp::ErrorData as McpError;
use rmcp::model::{CallToolRequestParam, CallToolResult, Content, Tool};
use serde_json::{Value, json};
use vibe_session::SessionManager;

use crate::params::{invalid_params, optional_bool, optional_str, require_str, require_user_id};

pub const LIST_FILES: &str = "vibe_list_files";
pub const READ_FILE: &str = "vibe_read_file";
pub const WRITE_FILE: &str = "vibe_write_file";
pub const EXECUTE_COMMAND: &str = "vibe_execute_command";
pub const VALIDATE_CODE: &str = "vibe_validate_code";
pub const RUN_TESTS: &str = "vibe_run_tests";
pub const GET_SESSION_INFO: &str = "vibe_get_session_info";

fn tool(name: &str, description: &str, schema: Value) -> Tool {
    serde_json::from_value(json!({
        "name": name,
        "description": description,
        "inputSchema": schema,
    }))
    .expect("static tool schema is well-formed")
}

/// The static tool catalog; stable across calls, so `list_tools` never has
/// to round-trip through a session.
pub fn catalog() -> Vec<Tool> {
    vec![
        tool(
            LIST_FILES,
            "List every file path known to the session (originals plus generated).",
            json!({
                "type": "object",
                "properties": {"user_id": {"type": ["string", "integer"]}},
                "required": ["user_id"],
            }),
        ),
        tool(
            READ_FILE,
            "Read a single file's content. A generated file wins over an original with the same path.",
            json!({
                "type": "object",
                "properties": {
                    "user_id": {"type": ["string", "integer"]},
                    "path": {"type": "string"},
                },
                "required": ["user_id", "path"],
            }),
        ),
        tool(
            WRITE_FILE,
            "Write (or overwrite) a file. Set generated=true for LM-authored output.",
            json!({
                "type": "object",
                "properties": {
                    "user_id": {"type": ["string", "integer"]},
                    "path": {"type": "string"},
                    "content": {"type": "string"},
                    "generated": {"type": "boolean"},
                },
                "required": ["user_id", "path", "content"],
            }),
        ),
        tool(
            EXECUTE_COMMAND,
            "Run an arbitrary shell command inside the session's sandbox.",
            json!({
                "type": "object",
                "properties": {
                    "user_id": {"type": ["string", "integer"]},
                    "command": {"type": "string"},
                },
                "required": ["user_id", "command"],
            }),
        ),
        tool(
            VALIDATE_CODE,
            "Run the project's validation commands inside the sandbox. Pass filename to scope validation to a single file.",
            json!({
                "type": "object",
                "properties": {
                    "user_id": {"type": ["string", "integer"]},
                    "filename": {"type": "string"},
                },
                "required": ["user_id"],
            }),
        ),
        tool(
            RUN_TESTS,
            "Run the session's selected test command inside the sandbox. With validate_and_fix=true, generates and iteratively repairs tests instead of just executing the existing command.",
            json!({
                "type": "object",
                "properties": {
                    "user_id": {"type": ["string", "integer"]},
                    "test_file": {"type": "string"},
                    "validate_and_fix": {"type": "boolean", "default": false},
                },
                "required": ["user_id"],
            }),
        ),
        tool(
            GET_SESSION_INFO,
            "Get a snapshot of session state: readiness, analysis, test command, file counts.",
            json!({
                "type": "object",
                "properties": {"user_id": {"type": ["string", "integer"]}},
                "required": ["user_id"],
            }),
        ),
    ]
}

fn text_result(body: impl Into<String>) -> CallToolResult {
    CallToolResult::success(vec![Content::text(body.into())])
}

fn error_result(body: impl Into<String>) -> CallToolResult {
    CallToolResult::error(vec![Content::text(body.into())])
}

async fn sessions(manager: &Weak<SessionManager>) -> Result<std::sync::Arc<SessionManager>, McpError> {
    manager
        .upgrade()
        .ok_or_else(|| McpError::internal_error("session manager is no longer available", None))
}

/// Dispatches a single `tools/call` request to the matching `vibe_*` handler.
pub async fn dispatch(
    manager: &Weak<SessionManager>,
    request: &CallToolRequestParam,
) -> Result<CallToolResult, McpError> {
    let manager = sessions(manager).await?;
    let args = &request.arguments;

    match request.name.as_ref() {
        LIST_FILES => {
            let user_id = require_user_id(args)?;
            let session = manager
                .get(&user_id)
                .await
                .map_err(|e| invalid_params(e.to_string()))?;
            let files = session.list_files().await;
            Ok(text_result(
                serde_json::to_string(&files).unwrap_or_default(),
            ))
        }
        READ_FILE => {
            let user_id = require_user_id(args)?;
            let path = require_str(args, "path")?;
            let session = manager
                .get(&user_id)
                .await
                .map_err(|e| invalid_params(e.to_string()))?;
            match session.read_file(path).await {
                Ok(content) => Ok(text_result(content)),
                Err(e) => Ok(error_result(e.to_string())),
            }
        }
        WRITE_FILE => {
            let user_id = require_user_id(args)?;
            let path = require_str(args, "path")?.to_string();
            let content = require_str(args, "content")?.to_string();
            let generated = optional_bool(args, "generated", false);
            let session = manager
                .get(&user_id)
                .await
                .map_err(|e| invalid_params(e.to_string()))?;
            session.write_file(&path, content, generated).await;
            Ok(text_result(format!("wrote {path}")))
        }
        EXECUTE_COMMAND => {
            let user_id = require_user_id(args)?;
            let command = require_str(args, "command")?;
            let session = manager
                .get(&user_id)
                .await
                .map_err(|e| invalid_params(e.to_string()))?;
            match session.execute_command(command).await {
                Ok(result) => Ok(text_result(
                    serde_json::to_string(&result).unwrap_or_default(),
                )),
                Err(e) => Ok(error_result(e.to_string())),
            }
        }
        VALIDATE_CODE => {
            let user_id = require_user_id(args)?;
            let filename = optional_str(args, "filename");
            let session = manager
                .get(&user_id)
                .await
                .map_err(|e| invalid_params(e.to_string()))?;
            let result = match filename {
                Some(filename) => session.validate_file(filename).await,
                None => session.validate_code().await,
            };
            match result {
                Ok(result) => Ok(text_result(
                    serde_json::to_string(&result).unwrap_or_default(),
                )),
                Err(e) => Ok(error_result(e.to_string())),
            }
        }
        RUN_TESTS => {
            let user_id = require_user_id(args)?;
            let test_file = optional_str(args, "test_file");
            let validate_and_fix = optional_bool(args, "validate_and_fix", false);
            let session = manager
                .get(&user_id)
                .await
                .map_err(|e| invalid_params(e.to_string()))?;

            if validate_and_fix {
                match session.generate_and_validate_tests("", test_file).await {
                    Ok(outcome) => Ok(text_result(
                        serde_json::to_string(&outcome).unwrap_or_default(),
                    )),
                    Err(e) => Ok(error_result(e.to_string())),
                }
            } else {
                let test_command = session
                    .test_command()
                    .await
                    .ok_or_else(|| invalid_params("session has no test command yet"))?;
                let command = match test_file {
                    Some(file) => format!("{test_command} {file}"),
                    None => test_command,
                };
                match session.execute_command(&command).await {
                    Ok(result) => Ok(text_result(
                        serde_json::to_string(&result).unwrap_or_default(),
                    )),
                    Err(e) => Ok(error_result(e.to_string())),
                }
            }
        }
        GET_SESSION_INFO => {
            let user_id = require_user_id(args)?;
            let session = manager
                .get(&user_id)
                .await
                .map_err(|e| invalid_params(e.to_string()))?;
            let info = session.get_info().await;
            Ok(text_result(json!({
                "user_id": info.user_id,
                "ready": info.ready,
                "container_id": info.container_id,
                "test_command": info.test_command,
                "file_count": info.file_count,
                "generated_file_count": info.generated_file_count,
            }).to_string()))
        }
        other => Err(McpError::invalid_params(
            format!("unknown tool: {other}"),
            None,
        )),
    }
}
