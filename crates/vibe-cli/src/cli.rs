use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "vibe", version)]
#[command(about = "VibeCoding session orchestrator: sandboxed setup, tools, and agent loops for one uploaded project")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract an uploaded archive, run the setup pipeline, then serve the
    /// Tool Server for that single session until the transport closes.
    Run {
        /// Path to the uploaded project archive (.zip).
        archive: std::path::PathBuf,

        /// User identifier the session is created under.
        #[arg(long)]
        user: String,

        /// Serve over SSE at this address instead of stdio (e.g. 127.0.0.1:8008).
        #[arg(long)]
        sse: Option<std::net::SocketAddr>,

        /// Token budget for the generated project context.
        #[arg(long, default_value_t = vibe_analysis::DEFAULT_TOKENS_LIMIT)]
        tokens_limit: u32,
    },

    /// Print the docker/mock sandbox driver that would be selected right now.
    Doctor,
}
