//! Script-driven stand-in for a real streaming recognizer.
//!
//! [`MockEngine`] is input-driven but content-blind: every ingested chunk
//! advances a looping word script by one word, emitted after a fixed
//! simulated latency.  A word is final when it ends a sentence or lands on
//! every 5th emission, which gives captions a plausible commit rhythm.
//!
//! All emission goes through one worker task consuming a job queue, so
//! increments leave in exactly the order chunks arrived no matter how the
//! runtime schedules the sleeps.  The queue is bounded and lossy: when it
//! is full, `ingest` drops the chunk instead of waiting — the task feeding
//! audio in is usually the same task draining increments out, and parking
//! it would wedge both sides.  `release` closes the queue and flips the
//! active flag; jobs still in the queue are drained without emitting, the
//! same way a cancelled backend drops in-flight results.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::engine::{EngineError, EngineFactory, Increment, TranscriptionEngine};

// ---------------------------------------------------------------------------
// Script
// ---------------------------------------------------------------------------

/// Looping transcript, one word per ingested chunk.
const SCRIPT: &[&str] = &[
    "Streaming", "audio", "arrives", "in", "timed", "chunks", "over", "a", "single", "socket.",
    "Energy", "gating", "keeps", "silence", "off", "the", "wire", "entirely.", "Captions",
    "build", "up", "word", "by", "word.",
];

/// Pending chunks the engine will buffer before `ingest` starts dropping.
const JOB_QUEUE_DEPTH: usize = 64;

// ---------------------------------------------------------------------------
// MockEngine
// ---------------------------------------------------------------------------

/// Default [`TranscriptionEngine`]: emits [`SCRIPT`] words one per chunk.
pub struct MockEngine {
    /// Job queue into the worker; `None` once released.
    jobs: Option<mpsc::Sender<()>>,
    /// Cleared by `release`; the worker re-checks it after each latency
    /// sleep so already-queued jobs die quietly.
    active: Arc<AtomicBool>,
}

impl MockEngine {
    /// Simulated recognizer latency per increment.
    pub const LATENCY: Duration = Duration::from_millis(80);

    /// Create an engine emitting increments on `increments`.
    ///
    /// Spawns the worker task onto the current runtime.  The worker exits
    /// when the engine is released (queue closed and drained) or when the
    /// increment receiver is dropped.
    pub fn new(increments: mpsc::Sender<Increment>) -> Self {
        let (jobs_tx, mut jobs_rx) = mpsc::channel::<()>(JOB_QUEUE_DEPTH);
        let active = Arc::new(AtomicBool::new(true));
        let worker_active = Arc::clone(&active);

        tokio::spawn(async move {
            let mut word_index = 0usize;
            while jobs_rx.recv().await.is_some() {
                tokio::time::sleep(Self::LATENCY).await;

                if !worker_active.load(Ordering::Acquire) {
                    continue;
                }

                let word = SCRIPT[word_index % SCRIPT.len()];
                word_index += 1;
                let is_final = word.ends_with('.') || word_index % 5 == 0;

                let increment = Increment {
                    text: format!("{word} "),
                    is_final,
                };
                if increments.send(increment).await.is_err() {
                    break;
                }
            }
        });

        Self {
            jobs: Some(jobs_tx),
            active,
        }
    }
}

#[async_trait]
impl TranscriptionEngine for MockEngine {
    /// Queue one increment job.  The chunk bytes themselves are ignored —
    /// arrival is the only signal the script needs.  A full queue drops the
    /// chunk rather than waiting for the worker to catch up.
    async fn ingest(&mut self, _chunk: &[u8]) -> Result<(), EngineError> {
        let Some(jobs) = &self.jobs else {
            // Released engines swallow input.
            return Ok(());
        };
        match jobs.try_send(()) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(())) => {
                log::trace!("job queue full, dropping chunk");
                Ok(())
            }
            Err(TrySendError::Closed(())) => {
                Err(EngineError::ChannelClosed("mock worker exited"))
            }
        }
    }

    async fn release(&mut self) -> Result<(), EngineError> {
        self.active.store(false, Ordering::Release);
        // Closing the queue lets the worker drain and exit.
        self.jobs.take();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MockEngineFactory
// ---------------------------------------------------------------------------

/// Factory handing out a fresh [`MockEngine`] per connection.
pub struct MockEngineFactory;

impl EngineFactory for MockEngineFactory {
    fn create(&self, increments: mpsc::Sender<Increment>) -> Box<dyn TranscriptionEngine> {
        Box::new(MockEngine::new(increments))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
