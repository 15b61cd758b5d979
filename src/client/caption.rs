//! Caption state: live text plus finalized history.
//!
//! [`CaptionAssembler`] folds the server's transcription events into the
//! state the UI renders: `live` accumulates non-final fragments, and a final
//! event commits `live + text` to `history` as one entry.  History order is
//! exactly the order final boundaries arrived.
//!
//! Stopping manually is the one asymmetry: a server-final commit keeps the
//! concatenation as-is, while [`CaptionAssembler::finalize_pending`] trims
//! surrounding whitespace — the fragment stream carries its own spacing, and
//! a hand-stopped caption should not end in a dangling space.

// ---------------------------------------------------------------------------
// CaptionAssembler
// ---------------------------------------------------------------------------

/// Merges incremental transcription fragments into live text and history.
///
/// # Example
///
/// ```rust
/// use live_caption::client::CaptionAssembler;
///
/// let mut captions = CaptionAssembler::new();
/// assert_eq!(captions.apply("Hello ", false), None);
/// assert_eq!(captions.apply("world.", true), Some("Hello world.".to_string()));
/// assert_eq!(captions.history(), ["Hello world."]);
/// assert_eq!(captions.live(), "");
/// ```
#[derive(Debug, Default)]
pub struct CaptionAssembler {
    live: String,
    history: Vec<String>,
}

impl CaptionAssembler {
    /// Empty caption state.
    pub fn new() -> Self {
        Self::default()
    }

    /// In-progress text accumulated since the last finalization.
    pub fn live(&self) -> &str {
        &self.live
    }

    /// Finalized entries, oldest first.
    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// Fold in one transcription event.
    ///
    /// Empty `text` is ignored entirely.  Non-final text extends the live
    /// line and returns `None`; final text commits the concatenated
    /// utterance to history and returns the committed entry.
    pub fn apply(&mut self, text: &str, is_final: bool) -> Option<String> {
        if text.is_empty() {
            return None;
        }

        if is_final {
            let entry = format!("{}{}", self.live, text);
            self.live.clear();
            self.history.push(entry.clone());
            Some(entry)
        } else {
            self.live.push_str(text);
            None
        }
    }

    /// Best-effort commit of the live line on manual stop.
    ///
    /// Trims surrounding whitespace; a whitespace-only live line is
    /// discarded.  Returns the committed entry, if any.  Guarantees no
    /// in-progress text is lost when the user stops before the server sends
    /// a final marker.
    pub fn finalize_pending(&mut self) -> Option<String> {
        let trimmed = self.live.trim();
        if trimmed.is_empty() {
            self.live.clear();
            return None;
        }

        let entry = trimmed.to_owned();
        self.live.clear();
        self.history.push(entry.clone());
        Some(entry)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
