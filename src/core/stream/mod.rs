//! Rev.ai real-time streaming transcription.
//!
//! A session is a single WebSocket over which raw audio is pushed while
//! transcript messages arrive asynchronously:
//!
//! - [`StreamService::dial`] validates a [`SessionConfig`], performs the
//!   handshake and returns a ready [`Connection`]
//! - [`Connection::write_audio`] sends binary audio frames
//! - [`Connection::signal_end_of_input`] sends the `EOS` sentinel (once)
//! - [`Connection::receive`] yields transcripts in wire order, then either
//!   `Ok(None)` after a normal closure or the error that ended the session
//! - [`Connection::close`] tears everything down and is idempotent
//!
//! # Close codes
//!
//! | Code | Meaning | Retryable |
//! |------|---------|-----------|
//! | 4001 | Unauthorized: invalid access credential | no |
//! | 4002 | Bad request: invalid content-type, oversized metadata, or unknown custom vocabulary id | no |
//! | 4003 | Insufficient credits to continue session | no |
//! | 4010 | Server shutting down | yes |
//! | 4013 | No streaming instance available | yes |
//! | 4029 | Too many concurrent connections | no |
//!
//! Any other code except `1000` surfaces as
//! [`StreamError::UnclassifiedClose`](StreamError::UnclassifiedClose).
//! Reconnecting is always the caller's decision.
//!
//! # Example
//!
//! ```rust,no_run
//! use revai_stream::config::ClientConfig;
//! use revai_stream::core::stream::{RevAiClient, SessionConfig};
//! use tokio_util::sync::CancellationToken;
//! use url::Url;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = RevAiClient::new(ClientConfig::new(
//!         Url::parse("https://api.rev.ai")?,
//!         "your-access-token",
//!     ));
//!     let session = SessionConfig::new("audio/x-wav");
//!
//!     let conn = client.stream().dial(&session, &CancellationToken::new()).await?;
//!     conn.write_audio(vec![0u8; 3200]).await?;
//!     conn.signal_end_of_input().await?;
//!
//!     while let Some(message) = conn.receive().await? {
//!         println!("{:?}: {}", message.message_type, message.text());
//!     }
//!
//!     conn.close().await?;
//!     Ok(())
//! }
//! ```

mod client;
pub mod close_codes;
mod config;
mod connection;
mod error;
mod messages;
mod receive_loop;
mod state;


pub use client::{RevAiClient, StreamService};
pub use close_codes::CloseReason;
pub use config::{STREAM_PATH, SessionConfig};
pub use connection::Connection;
pub use error::{DialError, StreamError, StreamResult};
pub use messages::{END_OF_STREAM, Element, ElementKind, MessageType, TranscriptMessage};
pub use receive_loop::MAX_REPEATED_READ_FAILURES;
pub use state::SessionState;
