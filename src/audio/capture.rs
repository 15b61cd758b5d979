//! The capture collaborator boundary.
//!
//! Real microphone capture and encoding live outside this crate; the
//! streaming pipeline only needs the two reads in [`CaptureSource`]: the
//! current frequency-bin window for energy sampling and the next encoded
//! chunk for transmission.
//!
//! [`ScriptedCapture`] is the bundled implementation: a deterministic
//! generator that alternates speech bursts with silence gaps so the gate,
//! the chunker, and a demo client all have something realistic to chew on
//! without any audio hardware.

use std::path::{Path, PathBuf};

use thiserror::Error;

// ---------------------------------------------------------------------------
// CaptureError
// ---------------------------------------------------------------------------

/// Errors raised while acquiring a capture source.
///
/// Acquisition failures are user-visible: the caller reports them and does
/// not open a connection (a session must never start without capture).
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The capture script file could not be read.
    #[error("could not read capture script {path}: {source}")]
    ScriptRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The capture script file parsed but contained no words.
    #[error("capture script {0} contains no words")]
    EmptyScript(PathBuf),
}

// ---------------------------------------------------------------------------
// CaptureSource trait
// ---------------------------------------------------------------------------

/// Object-safe interface to an audio capture collaborator.
///
/// Both methods are polled on fixed timers by the client loop:
/// `frequency_bins` at the sampling cadence, `next_chunk` at the chunk
/// cadence.  `next_chunk` returning `None` means nothing was captured in the
/// last window — distinct from a captured-but-silent chunk, which the gate
/// drops downstream.
pub trait CaptureSource: Send {
    /// Magnitudes of the current analysis window, one byte per bin (`0–255`).
    fn frequency_bins(&mut self) -> Vec<u8>;

    /// The next encoded audio chunk, or `None` when nothing was captured.
    fn next_chunk(&mut self) -> Option<Vec<u8>>;
}

// Compile-time assertion: Box<dyn CaptureSource> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn CaptureSource>) {}
};

// ---------------------------------------------------------------------------
// ScriptedCapture
// ---------------------------------------------------------------------------

/// Bins-per-window reported by the scripted analyser.
const BIN_COUNT: usize = 128;
/// Bin magnitude during a speech burst; mean reading 96 on the 0–255 scale.
const LOUD_BIN: u8 = 96;
/// Bin magnitude during a silence gap; mean reading 4.
const QUIET_BIN: u8 = 4;
/// Synthetic chunk payload size.  Must clear the server's minimum chunk
/// floor or the scripted audio would be filtered out on arrival.
const CHUNK_BYTES: usize = 120;

/// Deterministic capture source driven by a word script.
///
/// Phases alternate on the chunk clock: `burst_chunks` chunk windows of
/// speech, then `gap_chunks` windows of silence, looping forever.  During a
/// burst each window yields one synthetic chunk (the next script word padded
/// to [`CHUNK_BYTES`]) and loud frequency bins; during a gap it yields no
/// chunk and quiet bins.
///
/// The payload content is opaque to everything downstream — only its size
/// and timing matter.
#[derive(Debug)]
pub struct ScriptedCapture {
    words: Vec<String>,
    /// Index of the next script word to encode.
    cursor: usize,
    /// Chunk windows elapsed; drives the burst/gap phase.
    windows: u64,
    burst_chunks: u64,
    gap_chunks: u64,
}

impl ScriptedCapture {
    /// Default chunk windows per speech burst.
    const DEFAULT_BURST: u64 = 5;
    /// Default chunk windows per silence gap.
    const DEFAULT_GAP: u64 = 3;

    /// Words used by [`ScriptedCapture::builtin`].
    const DEMO_WORDS: &'static [&'static str] = &[
        "testing", "the", "live", "caption", "demo", "with", "a", "scripted", "microphone",
    ];

    /// Create a capture source from `words` with the default burst/gap
    /// cadence.
    pub fn new(words: Vec<String>) -> Self {
        Self::with_cadence(words, Self::DEFAULT_BURST, Self::DEFAULT_GAP)
    }

    /// Create a capture source with an explicit burst/gap cadence, in chunk
    /// windows.  Useful for tests that want short phases.
    pub fn with_cadence(words: Vec<String>, burst_chunks: u64, gap_chunks: u64) -> Self {
        assert!(!words.is_empty(), "capture script must contain at least one word");
        assert!(burst_chunks > 0, "burst_chunks must be > 0");
        Self {
            words,
            cursor: 0,
            windows: 0,
            burst_chunks,
            gap_chunks,
        }
    }

    /// Capture source using the built-in demo script.
    pub fn builtin() -> Self {
        Self::new(Self::DEMO_WORDS.iter().map(|w| w.to_string()).collect())
    }

    /// Load the word script from a whitespace-separated text file.
    ///
    /// # Errors
    ///
    /// - [`CaptureError::ScriptRead`] — the file could not be read.
    /// - [`CaptureError::EmptyScript`] — the file contains no words.
    pub fn from_file(path: &Path) -> Result<Self, CaptureError> {
        let content = std::fs::read_to_string(path).map_err(|source| CaptureError::ScriptRead {
            path: path.to_path_buf(),
            source,
        })?;

        let words: Vec<String> = content.split_whitespace().map(str::to_owned).collect();
        if words.is_empty() {
            return Err(CaptureError::EmptyScript(path.to_path_buf()));
        }
        Ok(Self::new(words))
    }

    /// `true` while the current chunk window falls inside a speech burst.
    fn speaking(&self) -> bool {
        self.windows % (self.burst_chunks + self.gap_chunks) < self.burst_chunks
    }

    /// Encode one script word as an opaque chunk payload.
    fn encode_chunk(word: &str) -> Vec<u8> {
        let mut chunk = word.as_bytes().to_vec();
        if chunk.len() < CHUNK_BYTES {
            chunk.resize(CHUNK_BYTES, 0);
        }
        chunk
    }
}

impl CaptureSource for ScriptedCapture {
    fn frequency_bins(&mut self) -> Vec<u8> {
        let level = if self.speaking() { LOUD_BIN } else { QUIET_BIN };
        vec![level; BIN_COUNT]
    }

    fn next_chunk(&mut self) -> Option<Vec<u8>> {
        let speaking = self.speaking();
        self.windows += 1;

        if !speaking {
            return None;
        }

        let word = &self.words[self.cursor % self.words.len()];
        self.cursor += 1;
        Some(Self::encode_chunk(word))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::EnergyMeter;
    use crate::config::{GateConfig, ServerConfig};
    use std::io::Write;

    fn words(list: &[&str]) -> Vec<String> {
        list.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn bursts_then_gaps_on_the_chunk_clock() {
        let mut capture = ScriptedCapture::with_cadence(words(&["a", "b"]), 2, 2);
        assert!(capture.next_chunk().is_some());
        assert!(capture.next_chunk().is_some());
        assert!(capture.next_chunk().is_none());
        assert!(capture.next_chunk().is_none());
        // Phase wraps around.
        assert!(capture.next_chunk().is_some());
    }

    #[test]
    fn chunks_clear_the_default_server_floor() {
        let mut capture = ScriptedCapture::builtin();
        let chunk = capture.next_chunk().expect("burst starts immediately");
        assert!(chunk.len() >= ServerConfig::default().min_chunk_bytes);
    }

    #[test]
    fn long_words_are_not_truncated() {
        let long = "x".repeat(CHUNK_BYTES * 2);
        let mut capture = ScriptedCapture::new(vec![long.clone()]);
        let chunk = capture.next_chunk().unwrap();
        assert_eq!(chunk.len(), long.len());
    }

    #[test]
    fn bins_cross_the_default_threshold_only_while_speaking() {
        let threshold = GateConfig::default().speech_threshold;
        let meter = EnergyMeter::new();
        let mut capture = ScriptedCapture::with_cadence(words(&["a"]), 1, 1);

        // Window 0: burst.
        assert!(meter.update(&capture.frequency_bins()) > threshold);
        capture.next_chunk();

        // Window 1: gap.
        assert!(meter.update(&capture.frequency_bins()) < threshold);
    }

    #[test]
    fn script_loops_over_its_words() {
        let mut capture = ScriptedCapture::with_cadence(words(&["one", "two"]), 10, 0);
        let first = capture.next_chunk().unwrap();
        let _second = capture.next_chunk().unwrap();
        let third = capture.next_chunk().unwrap();
        assert_eq!(first, third);
    }

    #[test]
    fn from_file_reads_whitespace_separated_words() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("script.txt");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "hello streaming\ncaptions").unwrap();

        let capture = ScriptedCapture::from_file(&path).expect("script loads");
        assert_eq!(capture.words, words(&["hello", "streaming", "captions"]));
    }

    #[test]
    fn from_file_missing_is_script_read_error() {
        let err = ScriptedCapture::from_file(Path::new("/nonexistent/script.txt")).unwrap_err();
        assert!(matches!(err, CaptureError::ScriptRead { .. }));
    }

    #[test]
    fn from_file_empty_is_empty_script_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("empty.txt");
        std::fs::File::create(&path).unwrap();

        let err = ScriptedCapture::from_file(&path).unwrap_err();
        assert!(matches!(err, CaptureError::EmptyScript(_)));
    }

    #[test]
    #[should_panic(expected = "at least one word")]
    fn empty_word_list_panics() {
        ScriptedCapture::new(Vec::new());
    }
}
