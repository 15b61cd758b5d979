//! Server entry point — accepts WebSocket connections and streams captions.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Parse CLI arguments.
//! 3. Load [`AppConfig`] from disk (returns default on first run) and apply
//!    CLI overrides.
//! 4. Bind the TCP listener.
//! 5. Serve until the process is interrupted.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;

use live_caption::{
    config::AppConfig,
    engine::MockEngineFactory,
    server::{self, ServerState},
};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Debug, Parser)]
#[command(name = "caption-server", about = "Real-time caption relay server", version)]
struct Args {
    /// Listen port (overrides the settings file)
    #[arg(long, env = "CAPTION_PORT")]
    port: Option<u16>,

    /// Interface to bind (overrides the settings file)
    #[arg(long)]
    host: Option<String>,

    /// Explicit settings file instead of the platform config dir
    #[arg(long)]
    config: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("live-caption server starting up");

    // 2. CLI
    let args = Args::parse();

    // 3. Configuration.  An explicit --config path must load; the default
    //    path degrades to built-in defaults when missing or unreadable.
    let config = match &args.config {
        Some(path) => AppConfig::load_from(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => AppConfig::load().unwrap_or_else(|e| {
            log::warn!("Failed to load config ({e}); using defaults");
            AppConfig::default()
        }),
    };

    let host = args.host.unwrap_or(config.server.host);
    let port = args.port.unwrap_or(config.server.port);

    // 4. Listener
    let listener = TcpListener::bind((host.as_str(), port))
        .await
        .with_context(|| format!("failed to bind {host}:{port}"))?;

    // 5. Serve.  Every connection gets its own session backed by the
    //    scripted mock engine.
    let state = ServerState::new(Arc::new(MockEngineFactory), config.server.min_chunk_bytes);
    server::serve(listener, state).await?;

    Ok(())
}
