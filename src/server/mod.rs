//! WebSocket listener and per-connection socket tasks.
//!
//! One axum router serves everything: WebSocket upgrades at `/` (plain GET
//! falls back to a one-line status body so a browser poke shows the server
//! is alive) and a `/health` probe.  Each upgraded connection runs
//! [`handle_socket`] as its own task — a single `select!` loop over socket
//! frames and engine increments, with no state shared across connections.
//!
//! ```text
//! binary frame ──▶ Session::ingest ──▶ engine
//! text frame   ──▶ stop control    ──▶ Session::stop
//! increment    ──▶ ServerEvent     ──▶ text frame out
//! close/error  ──▶ Session::stop, loop exit
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        ConnectInfo, State,
    },
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use crate::engine::{EngineFactory, Increment};
use crate::protocol::{self, ControlMessage, ServerEvent};

pub mod session;

pub use session::Session;

/// Increments buffered per connection before the engine's sender awaits.
const INCREMENT_BUFFER: usize = 32;

// ---------------------------------------------------------------------------
// ServerState
// ---------------------------------------------------------------------------

/// Shared listener state handed to every connection task.
pub struct ServerState {
    engines: Arc<dyn EngineFactory>,
    min_chunk_bytes: usize,
}

impl ServerState {
    /// `engines` builds one transcription engine per connection;
    /// `min_chunk_bytes` is the per-session frame floor.
    pub fn new(engines: Arc<dyn EngineFactory>, min_chunk_bytes: usize) -> Self {
        Self {
            engines,
            min_chunk_bytes,
        }
    }
}

// ---------------------------------------------------------------------------
// Router / serve
// ---------------------------------------------------------------------------

/// Build the application router.
pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .with_state(Arc::new(state))
}

/// Serve connections on an already-bound listener until the process exits.
///
/// Binding is left to the caller so tests can grab an ephemeral port and
/// read it back before the first connection.
pub async fn serve(listener: TcpListener, state: ServerState) -> std::io::Result<()> {
    let addr = listener.local_addr()?;
    log::info!("listening on {addr}");
    log::info!("websocket endpoint available at ws://{addr}");

    axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
}

/// `/` — WebSocket upgrade when requested, status text otherwise.
async fn root(
    State(state): State<Arc<ServerState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    upgrade: Option<WebSocketUpgrade>,
) -> Response {
    match upgrade {
        Some(upgrade) => upgrade
            .on_upgrade(move |socket| handle_socket(socket, addr, state))
            .into_response(),
        None => "live-caption server is running".into_response(),
    }
}

/// `/health` — liveness probe.
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

// ---------------------------------------------------------------------------
// Connection task
// ---------------------------------------------------------------------------

/// Drive one connection from upgrade to disconnect.
async fn handle_socket(socket: WebSocket, addr: SocketAddr, state: Arc<ServerState>) {
    log::info!("client connected from {addr}");

    let (inc_tx, mut inc_rx) = mpsc::channel::<Increment>(INCREMENT_BUFFER);
    let engine = state.engines.create(inc_tx);
    let mut session = Session::new(engine, state.min_chunk_bytes);

    let (mut sink, mut stream) = socket.split();
    // Once the engine worker exits the increment channel yields None
    // forever; the guard stops select from spinning on it.
    let mut inc_open = true;

    loop {
        tokio::select! {
            frame = stream.next() => match frame {
                Some(Ok(Message::Binary(chunk))) => {
                    log::trace!("{addr}: {} byte audio frame", chunk.len());
                    session.ingest(&chunk).await;
                }
                Some(Ok(Message::Text(raw))) => match protocol::parse_control(&raw) {
                    Some(ControlMessage::Stop) => {
                        log::debug!("{addr}: stop control");
                        session.stop().await;
                    }
                    None => log::debug!("{addr}: ignoring malformed text frame"),
                },
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
                Some(Ok(Message::Close(_))) | None => {
                    session.stop().await;
                    break;
                }
                Some(Err(e)) => {
                    log::debug!("{addr}: socket error: {e}");
                    session.stop().await;
                    break;
                }
            },
            increment = inc_rx.recv(), if inc_open => match increment {
                Some(increment) => {
                    // Late increments die here; empty ones never go out.
                    if !session.is_active() || increment.text.is_empty() {
                        continue;
                    }
                    let event = ServerEvent::Transcription {
                        text: increment.text,
                        is_final: increment.is_final,
                    };
                    let payload = match serde_json::to_string(&event) {
                        Ok(payload) => payload,
                        Err(e) => {
                            log::warn!("{addr}: failed to encode event: {e}");
                            continue;
                        }
                    };
                    if sink.send(Message::Text(payload)).await.is_err() {
                        session.stop().await;
                        break;
                    }
                }
                None => inc_open = false,
            },
        }
    }

    // Covers exit paths that have not stopped yet; a no-op otherwise.
    session.stop().await;
    log::info!("client disconnected: {addr}");
}
