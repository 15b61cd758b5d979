//! The transcription engine boundary.
//!
//! The server never speaks to a recognizer directly; everything goes through
//! [`TranscriptionEngine`], a narrow capability with exactly three moving
//! parts:
//!
//! * `ingest` — feed one audio chunk in.
//! * an increment channel — `{text, is_final}` events come back out, in
//!   ingestion order, on the `mpsc::Sender` handed to the factory.
//! * `release` — give the underlying resource back, idempotently.
//!
//! [`EngineFactory`] builds one engine per connection, wiring it to that
//! connection's increment channel.  [`MockEngine`] is the bundled
//! script-driven implementation; any real recognizer slots in behind the same
//! trait without touching the session or the protocol.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

pub mod mock;

pub use mock::{MockEngine, MockEngineFactory};

// ---------------------------------------------------------------------------
// Increment
// ---------------------------------------------------------------------------

/// One increment of transcribed text emitted by an engine.
///
/// `is_final` closes the current utterance.  Engines decide finality by
/// their own policy; consumers only rely on the flag, never the cadence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Increment {
    pub text: String,
    pub is_final: bool,
}

// ---------------------------------------------------------------------------
// EngineError
// ---------------------------------------------------------------------------

/// Errors surfaced by a transcription engine.
///
/// The session treats all of these as non-fatal: ingest failures are logged
/// and the session stays up, release failures are logged and the session
/// still reaches its terminal state.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine's worker or its increment consumer is gone.
    #[error("engine channel closed: {0}")]
    ChannelClosed(&'static str),

    /// Backend-specific failure while ingesting audio.
    #[error("ingest failed: {0}")]
    Ingest(String),

    /// Backend-specific failure while releasing the engine resource.
    #[error("release failed: {0}")]
    Release(String),
}

// ---------------------------------------------------------------------------
// TranscriptionEngine trait
// ---------------------------------------------------------------------------

/// Object-safe, async interface to a streaming transcription backend.
///
/// # Contract
///
/// - `ingest` accepts one opaque encoded chunk; increments for it arrive
///   later on the factory-wired channel, ordered relative to earlier chunks.
/// - `ingest` must not block waiting for increment-channel capacity; the
///   caller is typically the same task that drains that channel.  Input
///   that cannot be queued is dropped.
/// - `release` returns the backend resource and stops all future increments;
///   calling it again is a no-op.  Increments already in flight when
///   `release` is called may be dropped by the engine.
#[async_trait]
pub trait TranscriptionEngine: Send {
    /// Feed one audio chunk to the backend.
    async fn ingest(&mut self, chunk: &[u8]) -> Result<(), EngineError>;

    /// Release the backend resource.  Idempotent.
    async fn release(&mut self) -> Result<(), EngineError>;
}

// Compile-time assertion: Box<dyn TranscriptionEngine> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn TranscriptionEngine>) {}
};

// ---------------------------------------------------------------------------
// EngineFactory trait
// ---------------------------------------------------------------------------

/// Builds one engine per connection.
///
/// `increments` is the connection's event channel; everything the engine
/// emits for its session goes through it.  The factory itself is shared
/// across connections (`Send + Sync`), the engines it builds are not.
pub trait EngineFactory: Send + Sync {
    fn create(&self, increments: mpsc::Sender<Increment>) -> Box<dyn TranscriptionEngine>;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
