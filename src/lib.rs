//! Real-time streaming transcription over WebSocket.
//!
//! A client samples microphone energy, gates out silence, and streams the
//! surviving audio chunks to a server; the server feeds each connection's
//! chunks into a transcription engine and streams text increments back, which
//! the client assembles into a live caption plus finalized history.
//!
//! # Pipeline
//!
//! ```text
//! capture → EnergyMeter → Chunker → ws binary frames → Session → engine
//!                                                         │
//! CaptionAssembler ← ws text frames  ◀────────────────────┘
//! ```
//!
//! # Wire protocol
//!
//! | Direction       | Frame  | Payload                                            |
//! |-----------------|--------|----------------------------------------------------|
//! | client → server | binary | encoded audio chunk bytes                          |
//! | client → server | text   | `{"type":"stop"}`                                  |
//! | server → client | text   | `{"type":"transcription","text":…,"isFinal":…}`    |
//!
//! Malformed text frames are ignored on both sides; the connection stays
//! usable. See [`protocol`] for the message types.

pub mod audio;
pub mod client;
pub mod config;
pub mod engine;
pub mod protocol;
pub mod server;
