//! Per-connection transcription session state machine.
//!
//! One [`Session`] exists per WebSocket connection.  The state machine is:
//!
//! ```text
//! Active ──stop control──▶ Inactive
//!        ──channel close─▶ Inactive
//!        ──channel error─▶ Inactive   (terminal)
//! ```
//!
//! The engine handle lives *inside* the `Active` variant, so an inactive
//! session has nothing left to release — double-release is unrepresentable
//! rather than merely checked.

use crate::engine::TranscriptionEngine;

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// The two session phases.  `Inactive` is terminal.
enum SessionState {
    /// Accepting audio; owns the engine resource for this connection.
    Active {
        engine: Box<dyn TranscriptionEngine>,
    },
    /// Stopped.  Audio is ignored, increments are dropped, the engine is
    /// already released.
    Inactive,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Server-side lifecycle object mediating between one connection's audio
/// input and its transcription output.
pub struct Session {
    state: SessionState,
    /// Frames smaller than this are dropped before reaching the engine.
    /// The client gates audio too, but a remote peer's filtering is never
    /// trusted as a correctness guarantee.
    min_chunk_bytes: usize,
}

impl Session {
    /// Create an active session owning `engine`.
    pub fn new(engine: Box<dyn TranscriptionEngine>, min_chunk_bytes: usize) -> Self {
        Self {
            state: SessionState::Active { engine },
            min_chunk_bytes,
        }
    }

    /// `true` until the first [`Session::stop`].
    pub fn is_active(&self) -> bool {
        matches!(self.state, SessionState::Active { .. })
    }

    /// Forward one binary frame to the engine.
    ///
    /// Undersized frames are dropped, frames on an inactive session are
    /// ignored, and engine failures are logged without ending the session —
    /// a struggling backend looks like a slow one to the peer.
    pub async fn ingest(&mut self, chunk: &[u8]) {
        match &mut self.state {
            SessionState::Active { engine } => {
                if chunk.len() < self.min_chunk_bytes {
                    log::debug!(
                        "dropping undersized frame ({} < {} bytes)",
                        chunk.len(),
                        self.min_chunk_bytes
                    );
                    return;
                }
                if let Err(e) = engine.ingest(chunk).await {
                    log::warn!("engine ingest failed: {e}");
                }
            }
            SessionState::Inactive => {
                log::trace!("ignoring {} byte frame on inactive session", chunk.len());
            }
        }
    }

    /// Transition to `Inactive` and release the engine resource.
    ///
    /// Idempotent: the first call takes the engine out of the state, so
    /// later calls find nothing to release.  Release failures are logged,
    /// never propagated — the session reaches `Inactive` regardless.
    pub async fn stop(&mut self) {
        let previous = std::mem::replace(&mut self.state, SessionState::Inactive);
        if let SessionState::Active { mut engine } = previous {
            if let Err(e) = engine.release().await {
                log::warn!("engine release failed: {e}");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Test double that records every forwarded chunk and release call.
    struct RecordingEngine {
        chunks: Arc<Mutex<Vec<Vec<u8>>>>,
        releases: Arc<AtomicUsize>,
        fail_release: bool,
    }

    impl RecordingEngine {
        fn new() -> (Self, Arc<Mutex<Vec<Vec<u8>>>>, Arc<AtomicUsize>) {
            let chunks = Arc::new(Mutex::new(Vec::new()));
            let releases = Arc::new(AtomicUsize::new(0));
            let engine = Self {
                chunks: Arc::clone(&chunks),
                releases: Arc::clone(&releases),
                fail_release: false,
            };
            (engine, chunks, releases)
        }

        fn failing_release() -> (Self, Arc<AtomicUsize>) {
            let (mut engine, _chunks, releases) = Self::new();
            engine.fail_release = true;
            (engine, releases)
        }
    }

    #[async_trait]
    impl TranscriptionEngine for RecordingEngine {
        async fn ingest(&mut self, chunk: &[u8]) -> Result<(), EngineError> {
            self.chunks.lock().unwrap().push(chunk.to_vec());
            Ok(())
        }

        async fn release(&mut self) -> Result<(), EngineError> {
            self.releases.fetch_add(1, Ordering::SeqCst);
            if self.fail_release {
                return Err(EngineError::Release("simulated".into()));
            }
            Ok(())
        }
    }

    fn session_with_floor(floor: usize) -> (Session, Arc<Mutex<Vec<Vec<u8>>>>, Arc<AtomicUsize>) {
        let (engine, chunks, releases) = RecordingEngine::new();
        (Session::new(Box::new(engine), floor), chunks, releases)
    }

    #[tokio::test]
    async fn new_session_is_active() {
        let (session, _, _) = session_with_floor(100);
        assert!(session.is_active());
    }

    #[tokio::test]
    async fn frame_below_floor_is_dropped() {
        let (mut session, chunks, _) = session_with_floor(100);
        session.ingest(&[0; 99]).await;
        assert!(chunks.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn frame_at_floor_is_forwarded_unchanged() {
        let (mut session, chunks, _) = session_with_floor(100);
        let frame: Vec<u8> = (0..100).map(|i| i as u8).collect();
        session.ingest(&frame).await;

        let recorded = chunks.lock().unwrap();
        assert_eq!(*recorded, vec![frame]);
    }

    #[tokio::test]
    async fn stop_releases_engine_and_deactivates() {
        let (mut session, _, releases) = session_with_floor(100);
        session.stop().await;
        assert!(!session.is_active());
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn double_stop_releases_exactly_once() {
        let (mut session, _, releases) = session_with_floor(100);
        session.stop().await;
        session.stop().await;
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn ingest_after_stop_is_ignored() {
        let (mut session, chunks, _) = session_with_floor(100);
        session.stop().await;
        session.ingest(&[0; 200]).await;
        assert!(chunks.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn release_failure_still_reaches_inactive() {
        let (engine, releases) = RecordingEngine::failing_release();
        let mut session = Session::new(Box::new(engine), 100);

        session.stop().await;
        assert!(!session.is_active());
        assert_eq!(releases.load(Ordering::SeqCst), 1);

        // And the failed release is not retried.
        session.stop().await;
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn zero_floor_admits_small_frames() {
        let (mut session, chunks, _) = session_with_floor(0);
        session.ingest(&[1, 2, 3]).await;
        assert_eq!(chunks.lock().unwrap().len(), 1);
    }
}
