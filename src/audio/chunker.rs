//! Emission-time chunk gating.
//!
//! [`Chunker`] makes the per-chunk send/drop decision: a chunk goes out if
//! and only if it is non-empty and the latest [`EnergyMeter`] reading is
//! above the speech threshold.  There is no buffering and no backfill — a
//! dropped chunk is gone, and the decision looks at exactly one piece of
//! external state (the current reading).
//!
//! Admitted chunks pass through untouched; the chunker never re-encodes,
//! trims, or copies payload bytes.

use std::sync::Arc;

use crate::audio::EnergyMeter;

// ---------------------------------------------------------------------------
// Chunker
// ---------------------------------------------------------------------------

/// Per-chunk gate decision against a shared [`EnergyMeter`].
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use live_caption::audio::{Chunker, EnergyMeter};
///
/// let meter = Arc::new(EnergyMeter::new());
/// let chunker = Chunker::new(Arc::clone(&meter), 20.0);
///
/// // Nothing has been sampled yet — the default reading is silence.
/// assert!(chunker.admit(vec![1, 2, 3]).is_none());
///
/// meter.update(&[90; 32]);
/// assert_eq!(chunker.admit(vec![1, 2, 3]), Some(vec![1, 2, 3]));
/// ```
#[derive(Debug)]
pub struct Chunker {
    meter: Arc<EnergyMeter>,
    /// Readings must be strictly above this to count as speech; `0–255`
    /// scale, matching the meter.
    speech_threshold: f32,
}

impl Chunker {
    /// Create a chunker gating on `meter` readings above `speech_threshold`.
    pub fn new(meter: Arc<EnergyMeter>, speech_threshold: f32) -> Self {
        Self {
            meter,
            speech_threshold,
        }
    }

    /// Speech threshold currently in use.
    pub fn threshold(&self) -> f32 {
        self.speech_threshold
    }

    /// Forward `chunk` unchanged when it is non-empty and the latest energy
    /// reading exceeds the threshold; otherwise drop it and return `None`.
    pub fn admit(&self, chunk: Vec<u8>) -> Option<Vec<u8>> {
        if chunk.is_empty() || self.meter.read() <= self.speech_threshold {
            return None;
        }
        Some(chunk)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
