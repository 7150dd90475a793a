pub mod stream;

// Re-export commonly used types for convenience
pub use stream::{
    CloseReason, Connection, DialError, MessageType, RevAiClient, SessionConfig, SessionState,
    StreamError, StreamResult, StreamService, TranscriptMessage,
};
