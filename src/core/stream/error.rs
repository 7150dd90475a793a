use std::time::Duration;

use thiserror::Error;
use tokio_tungstenite::tungstenite;

use super::close_codes::CloseReason;
use super::state::SessionState;

pub type StreamResult<T> = Result<T, StreamError>;

/// Failure while establishing a streaming connection.
///
/// The core never retries a dial; the caller decides.
#[derive(Debug, Error)]
pub enum DialError {
    #[error("Invalid streaming address: {0}")]
    InvalidAddress(#[from] url::ParseError),

    #[error("Unsupported base URL scheme: {0}")]
    UnsupportedScheme(String),

    #[error("WebSocket handshake failed: {0}")]
    Handshake(#[source] tungstenite::Error),

    #[error("WebSocket handshake timed out after {0:?}")]
    Timeout(Duration),

    #[error("Dial cancelled before the handshake completed")]
    Cancelled,
}

/// Errors surfaced by a streaming session.
#[derive(Debug, Error)]
pub enum StreamError {
    /// Invalid session configuration, detected before dialing
    #[error("Invalid session configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Dial(#[from] DialError),

    /// A frame could not be written on an established connection
    #[error("Failed to write to stream: {0}")]
    Write(#[source] tungstenite::Error),

    #[error("Cannot {operation} while session is {state}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },

    /// The service closed the session with a code from the close-code table
    #[error("Streaming error: {0}")]
    Session(CloseReason),

    /// The session closed with a code the service does not define
    #[error("Stream closed with unclassified code {code}: {reason}")]
    UnclassifiedClose { code: u16, reason: String },

    /// The same read failure repeated too many times in a row
    #[error("Read failure repeated {occurrences} times in a row: {message}")]
    DecodeEscalation { occurrences: u32, message: String },

    /// The receive loop panicked
    #[error("Receive loop panicked: {0}")]
    Panic(String),
}

impl StreamError {
    /// Whether the caller is advised to open a brand-new session.
    ///
    /// Only close codes marked retryable in the close-code table qualify.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StreamError::Session(reason) if reason.retryable)
    }

    /// Close code carried by this error, if it came from a close frame.
    pub fn close_code(&self) -> Option<u16> {
        match self {
            StreamError::Session(reason) => Some(reason.code),
            StreamError::UnclassifiedClose { code, .. } => Some(*code),
            _ => None,
        }
    }
}
