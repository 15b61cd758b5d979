//! The client streaming loop.
//!
//! [`CaptionStreamer`] owns everything between the capture source and the
//! rendered caption: it connects to the server, then drives one `select!`
//! loop over four inputs —
//!
//! * the sampling tick: feed the current frequency bins into the meter,
//! * the chunk tick: pull a chunk from capture, gate it, send it as a
//!   binary frame,
//! * server frames: parse transcription events into the assembler and
//!   forward [`CaptionUpdate`]s to the owner,
//! * [`StreamCommand::Stop`]: send the stop control, close the channel.
//!
//! Channel close and channel error end the loop identically and silently:
//! the in-progress line is committed best-effort and a final
//! [`CaptionUpdate::Closed`] is emitted.  Only the initial connect can fail
//! loudly — there is no session yet to degrade into.

use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::audio::{CaptureSource, Chunker, EnergyMeter};
use crate::client::CaptionAssembler;
use crate::config::GateConfig;
use crate::protocol::{self, ControlMessage, ServerEvent};

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

// ---------------------------------------------------------------------------
// Commands / updates
// ---------------------------------------------------------------------------

/// Commands the owner can send into a running streamer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamCommand {
    /// End the session: stop control out, channel closed, pending live text
    /// committed trimmed.
    Stop,
}

/// Caption-state changes emitted to the owner, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptionUpdate {
    /// The channel is open and audio is about to flow.
    Connected,
    /// The live line changed; carries the full current live text.
    Live(String),
    /// An entry was committed to history.
    Committed(String),
    /// The stream ended; no further updates follow.
    Closed,
}

// ---------------------------------------------------------------------------
// StreamError
// ---------------------------------------------------------------------------

/// Errors a streamer can return to its owner.
///
/// Everything after a successful connect degrades into [`CaptionUpdate::Closed`]
/// instead of erroring.
#[derive(Debug, Error)]
pub enum StreamError {
    /// The initial connection could not be established.
    #[error("failed to connect to {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: tokio_tungstenite::tungstenite::Error,
    },
}

// ---------------------------------------------------------------------------
// CaptionStreamer
// ---------------------------------------------------------------------------

/// Streams gated audio to a server and assembles the returned captions.
pub struct CaptionStreamer {
    capture: Box<dyn CaptureSource>,
    meter: Arc<EnergyMeter>,
    chunker: Chunker,
    captions: CaptionAssembler,
    url: String,
    sample_interval: Duration,
    chunk_interval: Duration,
}

impl CaptionStreamer {
    /// Wire a capture source to a server URL with the given gate settings.
    pub fn new(capture: Box<dyn CaptureSource>, gate: &GateConfig, url: impl Into<String>) -> Self {
        let meter = Arc::new(EnergyMeter::new());
        let chunker = Chunker::new(Arc::clone(&meter), gate.speech_threshold);
        Self {
            capture,
            meter,
            chunker,
            captions: CaptionAssembler::new(),
            url: url.into(),
            sample_interval: Duration::from_millis(gate.sample_interval_ms),
            chunk_interval: Duration::from_millis(gate.chunk_interval_ms),
        }
    }

    /// Connect and run until stopped or disconnected.
    ///
    /// `commands` delivers [`StreamCommand`]s from the owner — the channel
    /// closing counts as a stop, so dropping the handle never leaves the
    /// loop running.  `updates` receives the ordered [`CaptionUpdate`]
    /// stream; send failures there are ignored (the owner has gone away,
    /// which ends the session soon after anyway).
    ///
    /// # Errors
    ///
    /// [`StreamError::Connect`] when the server cannot be reached.
    pub async fn run(
        mut self,
        mut commands: mpsc::Receiver<StreamCommand>,
        updates: mpsc::Sender<CaptionUpdate>,
    ) -> Result<(), StreamError> {
        let (socket, _response) =
            connect_async(&self.url)
                .await
                .map_err(|source| StreamError::Connect {
                    url: self.url.clone(),
                    source,
                })?;
        log::info!("connected to {}", self.url);
        let _ = updates.send(CaptionUpdate::Connected).await;

        let (mut sink, mut source) = socket.split();

        let mut sampler = interval(self.sample_interval);
        sampler.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut chunks = interval(self.chunk_interval);
        chunks.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = sampler.tick() => {
                    let bins = self.capture.frequency_bins();
                    self.meter.update(&bins);
                }
                _ = chunks.tick() => {
                    let Some(chunk) = self.capture.next_chunk() else { continue };
                    let Some(chunk) = self.chunker.admit(chunk) else { continue };
                    log::trace!(
                        "sending {} byte chunk (energy {:.1})",
                        chunk.len(),
                        self.meter.read()
                    );
                    if sink.send(Message::Binary(chunk)).await.is_err() {
                        // Send after close; same ending as a server close.
                        break;
                    }
                }
                frame = source.next() => match frame {
                    Some(Ok(Message::Text(raw))) => self.apply_event(&raw, &updates).await,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        log::debug!("socket error: {e}");
                        break;
                    }
                },
                command = commands.recv() => match command {
                    Some(StreamCommand::Stop) | None => {
                        self.send_stop(&mut sink).await;
                        break;
                    }
                },
            }
        }

        self.finish(&updates).await;
        Ok(())
    }

    /// Handle one text frame from the server.
    async fn apply_event(&mut self, raw: &str, updates: &mpsc::Sender<CaptionUpdate>) {
        match protocol::parse_event(raw) {
            Some(ServerEvent::Transcription { text, is_final }) => {
                if let Some(entry) = self.captions.apply(&text, is_final) {
                    let _ = updates.send(CaptionUpdate::Committed(entry)).await;
                } else if !text.is_empty() {
                    let _ = updates
                        .send(CaptionUpdate::Live(self.captions.live().to_owned()))
                        .await;
                }
            }
            None => log::debug!("ignoring malformed server frame"),
        }
    }

    /// Best-effort stop control + close; the session ends either way.
    async fn send_stop(&mut self, sink: &mut WsSink) {
        if let Ok(payload) = serde_json::to_string(&ControlMessage::Stop) {
            let _ = sink.send(Message::Text(payload)).await;
        }
        let _ = sink.close().await;
    }

    /// Commit any pending live text and announce the end of the stream.
    async fn finish(&mut self, updates: &mpsc::Sender<CaptionUpdate>) {
        if let Some(entry) = self.captions.finalize_pending() {
            let _ = updates.send(CaptionUpdate::Committed(entry)).await;
        }
        let _ = updates.send(CaptionUpdate::Closed).await;
        log::info!("caption stream closed");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
