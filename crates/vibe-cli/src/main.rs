use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;

mod cli;
mod driver_select;
mod transport;

use cli::{Cli, Commands};
use transport::ToolTransport;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init()
        .ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Doctor => {
            let (_, label) = driver_select::select_driver();
            println!("sandbox driver: {label}");
            Ok(())
        }
        Commands::Run {
            archive,
            user,
            sse,
            tokens_limit,
        } => run_session(archive, user, sse, tokens_limit).await,
    }
}

async fn run_session(
    archive: std::path::PathBuf,
    user: String,
    sse: Option<std::net::SocketAddr>,
    tokens_limit: u32,
) -> Result<()> {
    let bytes = std::fs::read(&archive)
        .with_context(|| format!("failed to read archive at {}", archive.display()))?;
    let files = vibe_archive::extract_archive(&bytes)
        .map_err(|e| anyhow::anyhow!("failed to extract archive: {e}"))?;

    let (driver, driver_label) = driver_select::select_driver();
    tracing::info!(driver = driver_label, file_count = files.len(), "extracted archive");

    let lm: Arc<dyn vibe_llm::LmClient> = Arc::new(vibe_llm::MockLmClient::new());
    let manager = Arc::new(vibe_session::SessionManager::new(
        Arc::clone(&driver),
        Arc::clone(&lm),
    ));

    let session = manager.create(user.clone(), files.clone()).await?;

    let outcome = vibe_setup::run_setup(files, driver.as_ref(), lm.as_ref(), tokens_limit)
        .await
        .context("setup pipeline failed")?;
    session
        .mark_ready(
            outcome.container_id,
            outcome.analysis,
            outcome.context,
            outcome.test_command,
        )
        .await;

    let handler = vibe_tools::ToolServerHandler::new(Arc::downgrade(&manager));
    match transport::resolve_transport(sse) {
        ToolTransport::Sse(addr) => {
            tracing::info!(%addr, "serving vibe-tools over SSE");
            let shutdown = Arc::new(tokio_util::sync::CancellationToken::new());
            let ctrl_c_shutdown = Arc::clone(&shutdown);
            tokio::spawn(async move {
                let _ = tokio::signal::ctrl_c().await;
                ctrl_c_shutdown.cancel();
            });
            vibe_tools::serve_sse_until(addr, handler, shutdown).await
        }
        ToolTransport::Stdio => {
            if let Some(endpoint) = transport::stdio_endpoint_override() {
                tracing::info!(endpoint, "serving vibe-tools over stdio");
            } else {
                tracing::info!("serving vibe-tools over stdio");
            }
            vibe_tools::serve_stdio(handler).await
        }
    }
}
