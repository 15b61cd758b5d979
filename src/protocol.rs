//! JSON wire messages exchanged over the WebSocket text channel.
//!
//! Binary frames (audio chunks) are opaque and never touch this module.
//! Text frames carry one of two tagged JSON objects:
//!
//! * [`ControlMessage`] — client → server, currently only `{"type":"stop"}`.
//! * [`ServerEvent`] — server → client, transcription increments.
//!
//! Parsing is deliberately tolerant: [`parse_control`] and [`parse_event`]
//! return `None` for invalid JSON or an unrecognized `type`, and callers drop
//! the frame without touching the connection.  A peer sending garbage must
//! never take the channel down.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ControlMessage
// ---------------------------------------------------------------------------

/// Control frames sent by the client.
///
/// `Stop` ends the transcription session without closing the channel; the
/// server releases the engine and ignores any further audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ControlMessage {
    /// `{"type":"stop"}`
    Stop,
}

// ---------------------------------------------------------------------------
// ServerEvent
// ---------------------------------------------------------------------------

/// Event frames sent by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerEvent {
    /// One increment of transcribed text.
    ///
    /// `text` is non-empty on the wire — the server suppresses empty
    /// increments before sending.  `is_final` marks the end of the current
    /// utterance; the client commits its accumulated live text on seeing it.
    Transcription {
        text: String,
        #[serde(rename = "isFinal")]
        is_final: bool,
    },
}

// ---------------------------------------------------------------------------
// Tolerant parsing
// ---------------------------------------------------------------------------

/// Parse a client control frame; `None` for anything malformed.
pub fn parse_control(raw: &str) -> Option<ControlMessage> {
    serde_json::from_str(raw).ok()
}

/// Parse a server event frame; `None` for anything malformed.
pub fn parse_event(raw: &str) -> Option<ServerEvent> {
    serde_json::from_str(raw).ok()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // --- serialization ---

    #[test]
    fn stop_serializes_to_wire_form() {
        let json = serde_json::to_string(&ControlMessage::Stop).unwrap();
        assert_eq!(json, r#"{"type":"stop"}"#);
    }

    #[test]
    fn transcription_event_uses_is_final_key() {
        let event = ServerEvent::Transcription {
            text: "hello ".into(),
            is_final: true,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(
            json,
            r#"{"type":"transcription","text":"hello ","isFinal":true}"#
        );
    }

    // --- parsing ---

    #[test]
    fn parse_stop_round_trip() {
        assert_eq!(
            parse_control(r#"{"type":"stop"}"#),
            Some(ControlMessage::Stop)
        );
    }

    #[test]
    fn parse_transcription_round_trip() {
        let event = parse_event(r#"{"type":"transcription","text":"a","isFinal":false}"#);
        assert_eq!(
            event,
            Some(ServerEvent::Transcription {
                text: "a".into(),
                is_final: false,
            })
        );
    }

    // --- malformed frames ---

    #[test]
    fn invalid_json_is_none() {
        assert_eq!(parse_control("not json"), None);
        assert_eq!(parse_event("not json"), None);
    }

    #[test]
    fn unknown_type_is_none() {
        assert_eq!(parse_control(r#"{"type":"bogus"}"#), None);
        assert_eq!(parse_event(r#"{"type":"bogus","text":"x"}"#), None);
    }

    #[test]
    fn missing_fields_is_none() {
        // A transcription frame without its payload fields is malformed.
        assert_eq!(parse_event(r#"{"type":"transcription"}"#), None);
    }

    #[test]
    fn empty_string_is_none() {
        assert_eq!(parse_control(""), None);
        assert_eq!(parse_event(""), None);
    }
}
