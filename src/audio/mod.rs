//! Client-side audio path — capture boundary → energy metering → gating.
//!
//! # Pipeline
//!
//! ```text
//! CaptureSource ── frequency_bins ──▶ EnergyMeter (sampling tick)
//!               ── next_chunk ─────▶ Chunker ──▶ ws binary frame (chunk tick)
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use live_caption::audio::{CaptureSource, Chunker, EnergyMeter, ScriptedCapture};
//!
//! let meter = Arc::new(EnergyMeter::new());
//! let chunker = Chunker::new(Arc::clone(&meter), 20.0);
//! let mut capture = ScriptedCapture::builtin();
//!
//! meter.update(&capture.frequency_bins());
//! if let Some(chunk) = capture.next_chunk().and_then(|c| chunker.admit(c)) {
//!     println!("would send {} bytes", chunk.len());
//! }
//! ```

pub mod capture;
pub mod chunker;
pub mod gate;

pub use capture::{CaptureError, CaptureSource, ScriptedCapture};
pub use chunker::Chunker;
pub use gate::EnergyMeter;
