//! Continuous energy estimation for voice-activity gating.
//!
//! [`EnergyMeter`] is the shared cell between the two timers on the client:
//! the sampling tick writes a fresh reading on every analysis window, and the
//! chunk tick reads the latest value when deciding whether a chunk is worth
//! sending (see [`crate::audio::Chunker`]).
//!
//! The meter is an estimator only — it never decides anything.  Keeping the
//! threshold comparison out of this type keeps the sampling cadence fully
//! decoupled from the chunk cadence.
//!
//! Single writer, single reader, one scalar: the value lives in an
//! `AtomicU32` holding `f32` bits, so neither side ever takes a lock.

use std::sync::atomic::{AtomicU32, Ordering};

// ---------------------------------------------------------------------------
// EnergyMeter
// ---------------------------------------------------------------------------

/// Lock-free cell holding the most recent mean signal energy.
///
/// Readings are the arithmetic mean of one frequency-bin magnitude array
/// (each bin `0–255`), so the reading itself sits on the same `0–255` scale.
/// A meter that has never been fed reads `0.0`, which keeps every consumer on
/// the quiet side of any sensible threshold until real data arrives.
///
/// # Example
///
/// ```rust
/// use live_caption::audio::EnergyMeter;
///
/// let meter = EnergyMeter::new();
/// assert_eq!(meter.read(), 0.0);
///
/// meter.update(&[10, 20, 30]);
/// assert_eq!(meter.read(), 20.0);
/// ```
#[derive(Debug)]
pub struct EnergyMeter {
    /// `f32` bits of the latest mean; `Relaxed` is enough for a single
    /// writer and a single reader exchanging one scalar.
    reading: AtomicU32,
}

impl EnergyMeter {
    /// Create a meter with an initial reading of `0.0`.
    pub fn new() -> Self {
        Self {
            reading: AtomicU32::new(0.0_f32.to_bits()),
        }
    }

    /// Store the mean magnitude of one analysis window and return it.
    ///
    /// An empty window stores `0.0` rather than dividing by zero.
    pub fn update(&self, bins: &[u8]) -> f32 {
        let mean = if bins.is_empty() {
            0.0
        } else {
            let sum: u32 = bins.iter().map(|&b| u32::from(b)).sum();
            sum as f32 / bins.len() as f32
        };
        self.reading.store(mean.to_bits(), Ordering::Relaxed);
        mean
    }

    /// Latest mean energy reading.
    pub fn read(&self) -> f32 {
        f32::from_bits(self.reading.load(Ordering::Relaxed))
    }
}

impl Default for EnergyMeter {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
