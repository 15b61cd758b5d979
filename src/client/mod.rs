//! Client side — stream gated audio out, assemble captions coming back.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use live_caption::audio::ScriptedCapture;
//! use live_caption::client::{CaptionStreamer, CaptionUpdate, StreamCommand};
//! use live_caption::config::GateConfig;
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let streamer = CaptionStreamer::new(
//!         Box::new(ScriptedCapture::builtin()),
//!         &GateConfig::default(),
//!         "ws://localhost:8080",
//!     );
//!
//!     let (cmd_tx, cmd_rx) = mpsc::channel::<StreamCommand>(4);
//!     let (update_tx, mut update_rx) = mpsc::channel::<CaptionUpdate>(32);
//!     tokio::spawn(streamer.run(cmd_rx, update_tx));
//!
//!     while let Some(update) = update_rx.recv().await {
//!         if let CaptionUpdate::Committed(entry) = update {
//!             println!("{entry}");
//!         }
//!     }
//!     drop(cmd_tx);
//! }
//! ```

pub mod caption;
pub mod stream;

pub use caption::CaptionAssembler;
pub use stream::{CaptionStreamer, CaptionUpdate, StreamCommand, StreamError};
