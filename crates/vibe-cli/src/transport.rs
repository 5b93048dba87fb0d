//! Resolves which tool-transport binding to serve, honoring the
//! `VIBE_TOOL_TRANSPORT`/`VIBE_MCP_SSE_URL`/`VIBE_MCP_STDIO_URL` environment
//! overrides whenever the CLI flags don't already pin a choice.

use std::net::SocketAddr;

const DEFAULT_SSE_ADDR: &str = "127.0.0.1:7878";

pub enum ToolTransport {
    Stdio,
    Sse(SocketAddr),
}

fn sse_addr_from_env() -> Option<SocketAddr> {
    std::env::var("VIBE_MCP_SSE_URL").ok()?.parse().ok()
}

/// `cli_sse` is the `--sse` flag; it wins outright when given. Otherwise
/// `VIBE_TOOL_TRANSPORT` picks the transport kind (`"sse"` or `"stdio"`,
/// case-insensitive), falling back to whichever `VIBE_MCP_SSE_URL` implies,
/// and finally to stdio.
pub fn resolve_transport(cli_sse: Option<SocketAddr>) -> ToolTransport {
    if let Some(addr) = cli_sse {
        return ToolTransport::Sse(addr);
    }

    match std::env::var("VIBE_TOOL_TRANSPORT").ok().as_deref().map(str::to_lowercase).as_deref() {
        Some("sse") => {
            let addr = sse_addr_from_env().unwrap_or_else(|| DEFAULT_SSE_ADDR.parse().unwrap());
            ToolTransport::Sse(addr)
        }
        Some("stdio") => ToolTransport::Stdio,
        _ => sse_addr_from_env().map(ToolTransport::Sse).unwrap_or(ToolTransport::Stdio),
    }
}

/// `VIBE_MCP_STDIO_URL` names the endpoint co-process clients should dial for
/// the stdio transport (our side always speaks actual process stdio; this is
/// surfaced for callers that need to advertise the address elsewhere).
pub fn stdio_endpoint_override() -> Option<String> {
    std::env::var("VIBE_MCP_STDIO_URL").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_flag_wins_over_env() {
        // SAFETY: test-local env mutation, no concurrent access in this process.
        unsafe {
            std::env::set_var("VIBE_TOOL_TRANSPORT", "stdio");
        }
        let addr: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        let transport = resolve_transport(Some(addr));
        assert!(matches!(transport, ToolTransport::Sse(a) if a == addr));
        unsafe {
            std::env::remove_var("VIBE_TOOL_TRANSPORT");
        }
    }

    #[test]
    fn env_transport_sse_falls_back_to_default_addr() {
        // SAFETY: test-local env mutation, no concurrent access in this process.
        unsafe {
            std::env::set_var("VIBE_TOOL_TRANSPORT", "SSE");
            std::env::remove_var("VIBE_MCP_SSE_URL");
        }
        let transport = resolve_transport(None);
        assert!(matches!(transport, ToolTransport::Sse(a) if a.to_string() == DEFAULT_SSE_ADDR));
        unsafe {
            std::env::remove_var("VIBE_TOOL_TRANSPORT");
        }
    }

    #[test]
    fn env_sse_url_selects_sse_without_transport_var() {
        // SAFETY: test-local env mutation, no concurrent access in this process.
        unsafe {
            std::env::remove_var("VIBE_TOOL_TRANSPORT");
            std::env::set_var("VIBE_MCP_SSE_URL", "127.0.0.1:1234");
        }
        let transport = resolve_transport(None);
        assert!(matches!(transport, ToolTransport::Sse(a) if a.port() == 1234));
        unsafe {
            std::env::remove_var("VIBE_MCP_SSE_URL");
        }
    }

    #[test]
    fn no_overrides_defaults_to_stdio() {
        // SAFETY: test-local env mutation, no concurrent access in this process.
        unsafe {
            std::env::remove_var("VIBE_TOOL_TRANSPORT");
            std::env::remove_var("VIBE_MCP_SSE_URL");
        }
        assert!(matches!(resolve_transport(None), ToolTransport::Stdio));
    }
}
