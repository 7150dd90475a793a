//! WebSocket message types for the Rev.ai streaming API.
//!
//! - **Incoming messages** (JSON text frames):
//!   - `connected`: handshake acknowledgement carrying the session id
//!   - `partial`: hypothesis that may still change
//!   - `final`: settled transcript for a stretch of audio
//!
//! - **Outgoing messages**:
//!   - Binary audio data (sent directly, no JSON wrapper)
//!   - The `EOS` text sentinel signalling end of input

use serde::{Deserialize, Serialize};

/// Text frame payload that tells the service no more audio will arrive.
pub const END_OF_STREAM: &str = "EOS";

/// Kind of an inbound streaming message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    /// Session accepted by the service
    Connected,
    /// Interim hypothesis
    Partial,
    /// Settled transcript
    Final,
    /// Any type this client does not know about
    #[serde(other)]
    Unknown,
}

/// Kind of a transcript element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    /// A recognised word
    Text,
    /// Punctuation or whitespace
    Punct,
    #[serde(other)]
    Other,
}

/// A single word or punctuation mark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    #[serde(rename = "type")]
    pub kind: ElementKind,
    pub value: String,
    /// Start time in seconds from the beginning of the stream
    #[serde(rename = "ts", default)]
    pub start_ts: f64,
    /// End time in seconds from the beginning of the stream
    #[serde(default)]
    pub end_ts: f64,
    /// Recognition confidence (0.0 to 1.0), absent on punctuation
    #[serde(default)]
    pub confidence: f64,
}

/// A transcript message received on the stream.
///
/// Messages are immutable once received and delivered in arrival order,
/// which is not necessarily ordered by `start_ts`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptMessage {
    #[serde(rename = "type")]
    pub message_type: MessageType,
    #[serde(rename = "ts", default)]
    pub start_ts: f64,
    #[serde(default)]
    pub end_ts: f64,
    #[serde(default)]
    pub elements: Vec<Element>,
    /// Session id, only present on `connected` messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl TranscriptMessage {
    /// Parse a JSON payload.
    pub fn parse(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }

    #[inline]
    pub fn is_final(&self) -> bool {
        self.message_type == MessageType::Final
    }

    #[inline]
    pub fn is_partial(&self) -> bool {
        self.message_type == MessageType::Partial
    }

    /// Concatenated element values.
    ///
    /// Final messages carry punctuation and spacing as their own elements,
    /// partial messages only carry words, so words are space-joined there.
    pub fn text(&self) -> String {
        match self.message_type {
            MessageType::Partial => self
                .elements
                .iter()
                .map(|e| e.value.as_str())
                .collect::<Vec<_>>()
                .join(" "),
            _ => self.elements.iter().map(|e| e.value.as_str()).collect(),
        }
    }

    /// Mean confidence over `text` elements, `None` when there are none.
    pub fn average_confidence(&self) -> Option<f64> {
        let words: Vec<f64> = self
            .elements
            .iter()
            .filter(|e| e.kind == ElementKind::Text)
            .map(|e| e.confidence)
            .collect();
        if words.is_empty() {
            return None;
        }
        Some((words.iter().sum::<f64>() / words.len() as f64).clamp(0.0, 1.0))
    }
}
