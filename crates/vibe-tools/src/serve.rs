//! Transport wiring: the same [`ToolServerHandler`] served over stdio (for a
//! single local agent) or SSE (for a shared, network-reachable hub).

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::DefaultBodyLimit;
use rmcp::ServiceExt;
use rmcp::transport::stdio;
use rmcp::transport::{SseServer, sse_server::SseServerConfig};
use tokio_util::sync::CancellationToken;

use crate::handler::ToolServerHandler;

const SSE_PATH: &str = "/";
const SSE_POST_PATH: &str = "/message";
const MAX_REQUEST_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Serves `handler` over the current process's stdin/stdout until the peer
/// disconnects. Used when a single agent process is wired directly to the
/// Tool Server as a child MCP server.
pub async fn serve_stdio(handler: ToolServerHandler) -> Result<()> {
    let service = handler
        .serve(stdio())
        .await
        .context("failed to start vibe-tools stdio transport")?;
    service
        .waiting()
        .await
        .context("vibe-tools stdio transport ended with an error")?;
    Ok(())
}

pub struct SseEndpoint {
    pub addr: SocketAddr,
    shutdown: CancellationToken,
    server_task: tokio::task::JoinHandle<()>,
}

impl SseEndpoint {
    /// Binds an HTTP/SSE listener and starts serving `handler` on it.
    pub async fn start(bind_addr: SocketAddr, handler: ToolServerHandler) -> Result<Self> {
        let listener = tokio::net::TcpListener::bind(bind_addr)
            .await
            .with_context(|| format!("failed to bind vibe-tools SSE endpoint at {bind_addr}"))?;
        let local_addr = listener
            .local_addr()
            .context("failed to resolve local vibe-tools SSE address")?;

        let shutdown = CancellationToken::new();
        let (sse_server, sse_router) = SseServer::new(SseServerConfig {
            bind: local_addr,
            sse_path: SSE_PATH.to_string(),
            post_path: SSE_POST_PATH.to_string(),
            ct: shutdown.clone(),
            sse_keep_alive: None,
        });
        let _server_ct = sse_server.with_service_directly({
            let handler = handler.clone();
            move || handler.clone()
        });

        let app = sse_router.layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES));
        let server_shutdown = shutdown.clone();
        let server_task = tokio::spawn(async move {
            if let Err(error) = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    server_shutdown.cancelled().await;
                })
                .await
            {
                tracing::warn!(error = %error, "vibe-tools SSE endpoint stopped with error");
            }
        });

        Ok(Self {
            addr: local_addr,
            shutdown,
            server_task,
        })
    }

    pub async fn shutdown(self) {
        self.shutdown.cancel();
        if let Err(error) = self.server_task.await {
            tracing::debug!(error = %error, "vibe-tools SSE endpoint join failed");
        }
    }
}

/// Convenience entry point used by the CLI: bind `bind_addr` and block until
/// a shutdown signal is observed on `shutdown`.
pub async fn serve_sse_until(
    bind_addr: SocketAddr,
    handler: ToolServerHandler,
    shutdown: Arc<CancellationToken>,
) -> Result<()> {
    let endpoint = SseEndpoint::start(bind_addr, handler).await?;
    shutdown.cancelled().await;
    endpoint.shutdown().await;
    Ok(())
}
