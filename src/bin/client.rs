//! Client entry point — streams gated audio to the server and renders the
//! captions it sends back on stdout.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Parse CLI arguments and load [`AppConfig`].
//! 3. Build the capture source (a script file, or the built-in demo lines).
//! 4. Spawn the streaming task and a ctrl-c watcher.
//! 5. Render caption updates until the stream closes.
//!
//! In-progress text repaints a single line; committed utterances scroll up
//! as ordinary lines.

use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tokio::sync::mpsc;

use live_caption::{
    audio::ScriptedCapture,
    client::{CaptionStreamer, CaptionUpdate, StreamCommand},
    config::AppConfig,
};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Debug, Parser)]
#[command(name = "caption-client", about = "Streaming caption client", version)]
struct Args {
    /// WebSocket URL of the caption server (overrides the settings file)
    #[arg(long, env = "CAPTION_URL")]
    url: Option<String>,

    /// Text file to speak, one word per whitespace-separated token,
    /// instead of the built-in demo lines
    #[arg(long)]
    script: Option<PathBuf>,

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
    log::info!("live-caption client starting up");

    // 2. CLI + configuration
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => AppConfig::load_from(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => AppConfig::load().unwrap_or_else(|e| {
            log::warn!("Failed to load config ({e}); using defaults");
            AppConfig::default()
        }),
    };

    let url = args.url.unwrap_or(config.client.server_url);

    // 3. Capture source.  A broken capture surfaces here, before any socket
    //    work happens.
    let capture = match &args.script {
        Some(path) => ScriptedCapture::from_file(path)
            .with_context(|| format!("could not start capture from {}", path.display()))?,
        None => ScriptedCapture::builtin(),
    };

    // 4. Streaming task + ctrl-c watcher
    let streamer = CaptionStreamer::new(Box::new(capture), &config.gate, url);

    let (command_tx, command_rx) = mpsc::channel::<StreamCommand>(4);
    let (update_tx, mut update_rx) = mpsc::channel::<CaptionUpdate>(32);

    let stream_task = tokio::spawn(streamer.run(command_rx, update_tx));

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = command_tx.send(StreamCommand::Stop).await;
        }
    });

    // 5. Render loop.  `\r\x1b[K` rewinds and clears the in-progress line so
    //    live text repaints in place.
    while let Some(update) = update_rx.recv().await {
        match update {
            CaptionUpdate::Connected => {
                log::info!("connected; streaming (ctrl-c to stop)");
            }
            CaptionUpdate::Live(text) => {
                print!("\r\x1b[K  {text}");
                let _ = std::io::stdout().flush();
            }
            CaptionUpdate::Committed(line) => {
                print!("\r\x1b[K");
                println!("{line}");
            }
            CaptionUpdate::Closed => break,
        }
    }

    // Surface connect failures with their cause chain.
    stream_task.await??;

    Ok(())
}
