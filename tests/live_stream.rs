//! End-to-end coverage: a real server on an ephemeral port, raw WebSocket
//! clients poking at the wire protocol, and the full client pipeline.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

use live_caption::{
    audio::ScriptedCapture,
    client::{CaptionAssembler, CaptionStreamer, CaptionUpdate, StreamCommand},
    config::GateConfig,
    engine::{EngineError, EngineFactory, Increment, MockEngineFactory, TranscriptionEngine},
    protocol::{parse_event, ServerEvent},
    server::{self, ServerState},
};

type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Spawn a server backed by the mock engine on an ephemeral port.
async fn spawn_server() -> SocketAddr {
    spawn_server_with(Arc::new(MockEngineFactory)).await
}

/// Spawn a server with a caller-chosen engine factory.
async fn spawn_server_with(engines: Arc<dyn EngineFactory>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let state = ServerState::new(engines, 100);
    tokio::spawn(async move {
        let _ = server::serve(listener, state).await;
    });
    addr
}

async fn connect(addr: SocketAddr) -> WsClient {
    let (socket, _) = connect_async(format!("ws://{addr}"))
        .await
        .expect("connect to test server");
    socket
}

/// A binary frame comfortably above the default minimum chunk size.
fn speech_chunk() -> Message {
    Message::Binary(vec![0x42; 120])
}

fn stop_frame() -> Message {
    Message::Text(r#"{"type":"stop"}"#.into())
}

/// Read frames until the next transcription event arrives.
async fn next_transcription(socket: &mut WsClient) -> (String, bool) {
    loop {
        let frame = timeout(Duration::from_secs(2), socket.next())
            .await
            .expect("timed out waiting for a transcription event")
            .expect("socket closed before an event arrived")
            .expect("websocket error");

        if let Message::Text(raw) = frame {
            let ServerEvent::Transcription { text, is_final } =
                parse_event(&raw).expect("server sent malformed JSON");
            return (text, is_final);
        }
    }
}

/// Assert that no frame at all arrives within `window`.
async fn assert_no_event(socket: &mut WsClient, window: Duration) {
    match timeout(window, socket.next()).await {
        Err(_) => {}
        Ok(frame) => panic!("expected silence, got {frame:?}"),
    }
}

// ---------------------------------------------------------------------------
// Wire-level tests
// ---------------------------------------------------------------------------

/// Five speech chunks produce five ordered increments; the fifth is final
/// and commits exactly one history line.
#[tokio::test]
async fn five_chunks_stream_five_events_and_commit_once() {
    let addr = spawn_server().await;
    let mut socket = connect(addr).await;

    for _ in 0..5 {
        socket.send(speech_chunk()).await.expect("send chunk");
    }

    let mut captions = CaptionAssembler::new();
    let mut committed = Vec::new();

    for _ in 0..5 {
        let (text, is_final) = next_transcription(&mut socket).await;
        if let Some(line) = captions.apply(&text, is_final) {
            committed.push(line);
        }
    }

    assert_eq!(committed, vec!["Streaming audio arrives in timed ".to_string()]);
    assert_eq!(captions.history(), committed.as_slice());
    assert!(captions.live().is_empty());

    socket.close(None).await.expect("close");
}

/// A 99-byte chunk sits under the floor and never reaches the engine; a
/// 100-byte chunk right at the floor is transcribed as the first word.
#[tokio::test]
async fn undersized_chunks_are_dropped_before_the_engine() {
    let addr = spawn_server().await;
    let mut socket = connect(addr).await;

    socket
        .send(Message::Binary(vec![0x42; 99]))
        .await
        .expect("send undersized");
    assert_no_event(&mut socket, Duration::from_millis(300)).await;

    socket
        .send(Message::Binary(vec![0x42; 100]))
        .await
        .expect("send at floor");
    let (text, _) = next_transcription(&mut socket).await;
    assert_eq!(text, "Streaming ");
}

/// Unparseable and unknown text frames are ignored without tearing the
/// session down.
#[tokio::test]
async fn malformed_control_frames_are_ignored() {
    let addr = spawn_server().await;
    let mut socket = connect(addr).await;

    socket
        .send(Message::Text("not json".into()))
        .await
        .expect("send garbage");
    socket
        .send(Message::Text(r#"{"type":"mystery"}"#.into()))
        .await
        .expect("send unknown type");
    // A client echoing a server-shaped event is just as unknown.
    socket
        .send(Message::Text(
            r#"{"type":"transcription","text":"x","isFinal":true}"#.into(),
        ))
        .await
        .expect("send server-shaped frame");

    socket.send(speech_chunk()).await.expect("send chunk");
    let (text, is_final) = next_transcription(&mut socket).await;
    assert_eq!(text, "Streaming ");
    assert!(!is_final);
}

/// Stop lands before the engine's simulated latency elapses, so the queued
/// chunk must never come back as a transcription.
#[tokio::test]
async fn stop_prevents_late_transcriptions() {
    let addr = spawn_server().await;
    let mut socket = connect(addr).await;

    socket.send(speech_chunk()).await.expect("send chunk");
    socket.send(stop_frame()).await.expect("send stop");

    assert_no_event(&mut socket, Duration::from_millis(400)).await;
}

/// A second stop is a no-op, and audio after stop is dropped silently.
#[tokio::test]
async fn stop_is_idempotent_and_audio_after_stop_is_dropped() {
    let addr = spawn_server().await;
    let mut socket = connect(addr).await;

    socket.send(stop_frame()).await.expect("send stop");
    socket.send(stop_frame()).await.expect("send stop again");
    socket.send(speech_chunk()).await.expect("send chunk");

    assert_no_event(&mut socket, Duration::from_millis(300)).await;

    // The connection itself stays usable for a clean shutdown.
    socket.close(None).await.expect("close");
}

// ---------------------------------------------------------------------------
// Engine misbehavior
// ---------------------------------------------------------------------------

/// Engine double with none of the mock's manners: every ingest emits an
/// empty increment and then a real one, with no latency, and release flushes
/// one final increment after the session has already stopped.
struct ChattyEngine {
    increments: mpsc::Sender<Increment>,
}

#[async_trait]
impl TranscriptionEngine for ChattyEngine {
    async fn ingest(&mut self, _chunk: &[u8]) -> Result<(), EngineError> {
        let _ = self
            .increments
            .send(Increment {
                text: String::new(),
                is_final: false,
            })
            .await;
        let _ = self
            .increments
            .send(Increment {
                text: "kept ".into(),
                is_final: false,
            })
            .await;
        Ok(())
    }

    async fn release(&mut self) -> Result<(), EngineError> {
        let _ = self
            .increments
            .send(Increment {
                text: "ghost ".into(),
                is_final: true,
            })
            .await;
        Ok(())
    }
}

struct ChattyEngineFactory;

impl EngineFactory for ChattyEngineFactory {
    fn create(&self, increments: mpsc::Sender<Increment>) -> Box<dyn TranscriptionEngine> {
        Box::new(ChattyEngine { increments })
    }
}

/// The connection task filters what engines emit: empty text never goes
/// out, and an increment arriving after stop dies in the server instead of
/// reaching the wire.
#[tokio::test]
async fn empty_and_post_stop_increments_never_reach_the_client() {
    let addr = spawn_server_with(Arc::new(ChattyEngineFactory)).await;
    let mut socket = connect(addr).await;

    socket.send(speech_chunk()).await.expect("send chunk");

    // Of the two increments the chunk produced, only the non-empty one
    // comes back.
    let (text, is_final) = next_transcription(&mut socket).await;
    assert_eq!(text, "kept ");
    assert!(!is_final);
    assert_no_event(&mut socket, Duration::from_millis(300)).await;

    // Stop flips the session inactive before the release-time increment is
    // picked up, so it must be swallowed.
    socket.send(stop_frame()).await.expect("send stop");
    assert_no_event(&mut socket, Duration::from_millis(300)).await;

    socket.close(None).await.expect("close");
}

// ---------------------------------------------------------------------------
// Full client pipeline
// ---------------------------------------------------------------------------

/// Drive the real client (scripted capture, gate, assembler) against the
/// real server and watch the first sentence commit.
#[tokio::test]
async fn streamer_commits_the_first_scripted_sentence() {
    let addr = spawn_server().await;

    // Fast cadence so several bursts fit in a short test.
    let gate = GateConfig {
        sample_interval_ms: 5,
        chunk_interval_ms: 20,
        ..GateConfig::default()
    };
    let capture = ScriptedCapture::builtin();
    let streamer = CaptionStreamer::new(Box::new(capture), &gate, format!("ws://{addr}"));

    let (command_tx, command_rx) = mpsc::channel(4);
    let (update_tx, mut update_rx) = mpsc::channel(64);
    let task = tokio::spawn(streamer.run(command_rx, update_tx));

    let mut saw_connected = false;
    let mut first_commit = None;

    while first_commit.is_none() {
        let update = timeout(Duration::from_secs(5), update_rx.recv())
            .await
            .expect("timed out waiting for a commit")
            .expect("stream ended before a commit");
        match update {
            CaptionUpdate::Connected => saw_connected = true,
            CaptionUpdate::Committed(line) => first_commit = Some(line),
            CaptionUpdate::Live(_) | CaptionUpdate::Closed => {}
        }
    }

    assert!(saw_connected, "Connected should precede any caption update");
    assert_eq!(
        first_commit.as_deref(),
        Some("Streaming audio arrives in timed ")
    );

    command_tx.send(StreamCommand::Stop).await.expect("stop");

    // Drain to Closed so the task winds down cleanly.
    loop {
        match timeout(Duration::from_secs(2), update_rx.recv()).await {
            Ok(Some(CaptionUpdate::Closed)) | Ok(None) => break,
            Ok(Some(_)) => {}
            Err(_) => panic!("stream did not close after stop"),
        }
    }

    task.await.expect("join").expect("stream task failed");
}

// ---------------------------------------------------------------------------
// Plain HTTP surface
// ---------------------------------------------------------------------------

/// Non-upgrade requests get the plain-text fallback; /health reports ok.
#[tokio::test]
async fn http_root_and_health_respond() {
    let addr = spawn_server().await;

    let root = reqwest::get(format!("http://{addr}/")).await.expect("GET /");
    assert!(root.status().is_success());
    let body = root.text().await.expect("body");
    assert!(body.contains("running"), "fallback body was {body:?}");

    let health = reqwest::get(format!("http://{addr}/health"))
        .await
        .expect("GET /health");
    assert!(health.status().is_success());
    let json: serde_json::Value = health.json().await.expect("json body");
    assert_eq!(json["status"], "ok");
}
