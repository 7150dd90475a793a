//! Background receive loop for a streaming session.
//!
//! One loop runs per connection. It decodes inbound frames into
//! [`TranscriptMessage`]s and publishes them, in wire order, on a bounded
//! channel drained by [`Connection::receive`](super::Connection::receive).
//!
//! The loop terminates on the first of:
//! - a close frame (`1000` ends the stream cleanly, anything else is
//!   published as an error)
//! - the same read failure repeating more than
//!   [`MAX_REPEATED_READ_FAILURES`] times in a row
//! - the transport ending without a close frame
//! - a shutdown request from the connection
//! - a panic in the loop body
//!
//! Whatever the exit path, the socket is closed (unless the connection already
//! closed it), at most one error is published, and the channel is closed
//! exactly once, when the loop's sender is dropped.

use std::sync::Arc;

use futures::{Stream, StreamExt};
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{self, Message, protocol::CloseFrame};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::close_codes::{CLOSE_ABNORMAL, CLOSE_NO_STATUS, CLOSE_NORMAL, CloseReason};
use super::connection::{SharedSink, shut_down_sink};
use super::error::StreamError;
use super::messages::{MessageType, TranscriptMessage};
use super::state::SessionStateCell;
use crate::utils::panic::catch_panic;

/// Consecutive identical read failures tolerated before the session is
/// abandoned. The next identical failure is fatal.
pub const MAX_REPEATED_READ_FAILURES: u32 = 5;

/// What the loop publishes: a transcript or the error that ended the session.
pub(crate) type Delivery = Result<TranscriptMessage, StreamError>;

/// Tracks consecutive identical read failures.
#[derive(Debug, Default)]
pub(crate) struct RepeatedFailureGuard {
    previous: Option<String>,
    occurrences: u32,
}

impl RepeatedFailureGuard {
    /// Record a failure. Returns the occurrence count once it exceeds
    /// [`MAX_REPEATED_READ_FAILURES`].
    pub(crate) fn record(&mut self, failure: &str) -> Option<u32> {
        if self.previous.as_deref() == Some(failure) {
            self.occurrences += 1;
        } else {
            self.previous = Some(failure.to_string());
            self.occurrences = 1;
        }

        (self.occurrences > MAX_REPEATED_READ_FAILURES).then_some(self.occurrences)
    }

    pub(crate) fn reset(&mut self) {
        self.previous = None;
        self.occurrences = 0;
    }
}

/// Map a close code to the error it surfaces, `None` for a normal closure.
pub(crate) fn classify_close(code: u16, reason: &str) -> Option<StreamError> {
    if code == CLOSE_NORMAL {
        return None;
    }

    match CloseReason::lookup(code) {
        Some(classified) => Some(StreamError::Session(classified)),
        None => Some(StreamError::UnclassifiedClose {
            code,
            reason: reason.to_string(),
        }),
    }
}

enum Step {
    Deliver(TranscriptMessage),
    Skip,
    Finish(Option<StreamError>),
}

pub(crate) struct ReceiveLoop<S> {
    stream: S,
    output: mpsc::Sender<Delivery>,
    sink: SharedSink,
    state: Arc<SessionStateCell>,
    session_id: Arc<RwLock<Option<String>>>,
    shutdown: CancellationToken,
    guard: RepeatedFailureGuard,
    last_transport_error: Option<String>,
}

impl<S> ReceiveLoop<S>
where
    S: Stream<Item = Result<Message, tungstenite::Error>> + Unpin + Send + 'static,
{
    pub(crate) fn new(
        stream: S,
        output: mpsc::Sender<Delivery>,
        sink: SharedSink,
        state: Arc<SessionStateCell>,
        session_id: Arc<RwLock<Option<String>>>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            stream,
            output,
            sink,
            state,
            session_id,
            shutdown,
            guard: RepeatedFailureGuard::default(),
            last_transport_error: None,
        }
    }

    /// Start the loop on the tokio runtime.
    pub(crate) fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run_supervised())
    }

    /// Run the loop to completion, marking the session closed, closing the
    /// socket and then publishing its terminal error (or panic).
    pub(crate) async fn run_supervised(self) {
        let output = self.output.clone();
        let sink = self.sink.clone();
        let state = self.state.clone();
        let shutdown = self.shutdown.clone();

        let failure = match catch_panic(self.run()).await {
            Ok(failure) => failure,
            Err(panic_msg) => Some(StreamError::Panic(panic_msg)),
        };

        state.close();

        if shut_down_sink(&sink).await {
            debug!("Receive loop closed the socket");
        }

        if let Some(err) = failure {
            error!("Streaming session terminated: {}", err);
            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("Connection closed before the session error was delivered");
                }
                _ = output.send(Err(err)) => {}
            }
        }

        debug!("Receive loop finished");
    }

    async fn run(mut self) -> Option<StreamError> {
        loop {
            let frame = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => {
                    debug!("Receive loop stopped by connection close");
                    return None;
                }
                frame = self.stream.next() => frame,
            };

            match self.handle_frame(frame) {
                Step::Deliver(message) => {
                    // Bounded channel: a slow consumer blocks the loop rather
                    // than losing messages.
                    tokio::select! {
                        biased;
                        _ = self.shutdown.cancelled() => return None,
                        sent = self.output.send(Ok(message)) => {
                            if sent.is_err() {
                                debug!("Transcript receiver dropped, stopping receive loop");
                                return None;
                            }
                        }
                    }
                }
                Step::Skip => {}
                Step::Finish(failure) => return failure,
            }
        }
    }

    fn handle_frame(&mut self, frame: Option<Result<Message, tungstenite::Error>>) -> Step {
        match frame {
            Some(Ok(Message::Text(text))) => {
                debug!("Received streaming message: {}", text.as_str());
                self.decode(text.as_str())
            }
            Some(Ok(Message::Binary(data))) => match std::str::from_utf8(&data) {
                Ok(text) => self.decode(text),
                Err(e) => self.read_failure(format!("binary frame is not UTF-8: {e}")),
            },
            Some(Ok(Message::Close(frame))) => Step::Finish(self.on_close(frame)),
            Some(Ok(Message::Ping(_))) => {
                debug!("Received ping");
                Step::Skip
            }
            Some(Ok(Message::Pong(_))) | Some(Ok(Message::Frame(_))) => Step::Skip,
            Some(Err(tungstenite::Error::ConnectionClosed))
            | Some(Err(tungstenite::Error::AlreadyClosed))
            | None => Step::Finish(Some(self.abnormal_closure())),
            Some(Err(e)) => {
                let failure = e.to_string();
                self.last_transport_error = Some(failure.clone());
                self.read_failure(failure)
            }
        }
    }

    fn decode(&mut self, payload: &str) -> Step {
        match TranscriptMessage::parse(payload) {
            Ok(message) => {
                self.guard.reset();
                if message.message_type == MessageType::Connected {
                    info!(
                        "Streaming session accepted (id: {})",
                        message.id.as_deref().unwrap_or("<none>")
                    );
                    *self.session_id.write() = message.id;
                    return Step::Skip;
                }
                Step::Deliver(message)
            }
            Err(e) => self.read_failure(format!("failed to decode transcript message: {e}")),
        }
    }

    fn read_failure(&mut self, failure: String) -> Step {
        match self.guard.record(&failure) {
            Some(occurrences) => Step::Finish(Some(StreamError::DecodeEscalation {
                occurrences,
                message: failure,
            })),
            None => {
                warn!("Dropping unreadable frame: {}", failure);
                Step::Skip
            }
        }
    }

    fn on_close(&self, frame: Option<CloseFrame>) -> Option<StreamError> {
        let (code, reason) = match frame {
            Some(frame) => (u16::from(frame.code), frame.reason.as_str().to_string()),
            None => (CLOSE_NO_STATUS, String::new()),
        };

        if code == CLOSE_NORMAL {
            info!("Streaming session closed normally");
        } else {
            info!("Streaming session closed with code {}: {}", code, reason);
        }

        classify_close(code, &reason)
    }

    fn abnormal_closure(&self) -> StreamError {
        StreamError::UnclassifiedClose {
            code: CLOSE_ABNORMAL,
            reason: self
                .last_transport_error
                .clone()
                .unwrap_or_else(|| "connection closed without a close frame".to_string()),
        }
    }
}
