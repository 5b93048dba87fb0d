//! The `rmcp::ServerHandler` implementation backing the Tool Server.

use std::sync::Weak;

use rmcp::ErrorData as McpError;
use rmcp::model::{
    CallToolRequestParam, CallToolResult, ListToolsResult, PaginatedRequestParam,
    ServerCapabilities, ServerInfo,
};
use rmcp::service::RequestContext;
use rmcp::{RoleServer, ServerHandler};
use vibe_session::SessionManager;

use crate::tools::{catalog, dispatch};

/// Exposes the seven `vibe_*` tools over MCP. Holds only a [`Weak`]
/// reference into the session registry: the Session Manager owns sessions
/// and, transitively, the sandbox driver; the Tool Server must not keep
/// either alive on its own.
#[derive(Clone)]
pub struct ToolServerHandler {
    sessions: Weak<SessionManager>,
}

impl ToolServerHandler {
    pub fn new(sessions: Weak<SessionManager>) -> Self {
        Self { sessions }
    }
}

impl ServerHandler for ToolServerHandler {
    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult::with_all_items(catalog()))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        dispatch(&self.sessions, &request).await
    }

    fn get_info(&self) -> ServerInfo {
        let mut info = ServerInfo::default();
        info.server_info.name = "vibe-tools".to_string();
        info.server_info.version = env!("CARGO_PKG_VERSION").to_string();
        info.capabilities = ServerCapabilities::builder().enable_tools().build();
        info
    }
}
