//! A live streaming session.
//!
//! The [`Connection`] owns the socket and the receive loop started for it.
//! Audio and the end-of-input sentinel go out through the write half; the
//! receive loop owns the read half and feeds [`Connection::receive`].
//!
//! ```text
//! ┌────────────────────┐                      ┌──────────────────┐
//! │ write_audio()      │────── binary ───────▶│                  │
//! │ signal_end_of_input│────── "EOS" ────────▶│    WebSocket     │
//! └────────────────────┘                      │                  │
//!                                             └────────┬─────────┘
//!                                                      │ frames
//!                          ┌──────────────────┐   ┌────▼─────────┐
//! receive() ◀──────────────│ bounded mpsc     │◀──│ ReceiveLoop  │
//!                          └──────────────────┘   └──────────────┘
//! ```
//!
//! All methods take `&self`, so a connection can be shared through an `Arc`
//! between a writer task and a reader task. Writers must still be serialized
//! by the caller: two concurrent `write_audio` calls interleave frames in an
//! unspecified order.

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::{Sink, SinkExt, Stream, StreamExt};
use parking_lot::RwLock;
use tokio::net::TcpStream;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::error::{StreamError, StreamResult};
use super::messages::{END_OF_STREAM, TranscriptMessage};
use super::receive_loop::{Delivery, ReceiveLoop};
use super::state::{SessionState, SessionStateCell};

/// How long `close` waits for the receive loop before aborting it.
const RECEIVE_LOOP_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

pub(crate) type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Write half of a session socket.
pub(crate) type BoxedSink = Pin<Box<dyn Sink<Message, Error = tungstenite::Error> + Send>>;

/// Write half shared by the connection and its receive loop; `None` once shut.
pub(crate) type SharedSink = Arc<Mutex<Option<BoxedSink>>>;

/// Send a normal close frame and shut the write half.
///
/// Only the first caller per session does anything; returns whether this
/// call was it. Transport failures are logged, not returned.
pub(crate) async fn shut_down_sink(shared: &SharedSink) -> bool {
    let Some(mut sink) = shared.lock().await.take() else {
        return false;
    };

    let close_frame = CloseFrame {
        code: CloseCode::Normal,
        reason: "".into(),
    };
    if let Err(e) = sink.send(Message::Close(Some(close_frame))).await {
        debug!("Close frame not sent: {}", e);
    }
    if let Err(e) = sink.close().await {
        debug!("Error closing WebSocket: {}", e);
    }
    true
}

/// A streaming transcription session.
///
/// Obtained from [`StreamService::dial`](super::StreamService::dial).
/// The socket is closed once per session, by whichever comes first: the
/// receive loop ending (server close, fatal error, panic) or
/// [`Connection::close`]. Dropping the connection stops the receive loop,
/// which closes the socket; call `close` to also wait for the loop to finish.
pub struct Connection {
    /// Write half of the socket, shared with the receive loop
    sink: SharedSink,

    /// Transcripts and the terminal error published by the receive loop
    transcripts: Mutex<mpsc::Receiver<Delivery>>,

    state: Arc<SessionStateCell>,

    /// Session id announced by the service (shared with the receive loop)
    session_id: Arc<RwLock<Option<String>>>,

    /// Stops the receive loop
    shutdown: CancellationToken,

    receive_handle: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl Connection {
    /// Split the socket and start its receive loop.
    ///
    /// Must be called from within a tokio runtime.
    pub(crate) fn start(ws_stream: WsStream, queue_capacity: usize) -> Self {
        let (sink, stream) = ws_stream.split();
        Self::from_parts(Box::pin(sink), stream, queue_capacity)
    }

    pub(crate) fn from_parts<S>(sink: BoxedSink, stream: S, queue_capacity: usize) -> Self
    where
        S: Stream<Item = Result<Message, tungstenite::Error>> + Unpin + Send + 'static,
    {
        let (transcript_tx, transcript_rx) = mpsc::channel::<Delivery>(queue_capacity.max(1));

        let sink: SharedSink = Arc::new(Mutex::new(Some(sink)));
        let state = Arc::new(SessionStateCell::new());
        let session_id = Arc::new(RwLock::new(None));
        let shutdown = CancellationToken::new();

        let receive_handle = ReceiveLoop::new(
            stream,
            transcript_tx,
            sink.clone(),
            state.clone(),
            session_id.clone(),
            shutdown.clone(),
        )
        .spawn();

        Self {
            sink,
            transcripts: Mutex::new(transcript_rx),
            state,
            session_id,
            shutdown,
            receive_handle: parking_lot::Mutex::new(Some(receive_handle)),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state.get()
    }

    /// Session id from the service's `connected` message, once received.
    pub fn session_id(&self) -> Option<String> {
        self.session_id.read().clone()
    }

    /// Send a chunk of raw audio as one binary frame.
    ///
    /// # Errors
    ///
    /// - [`StreamError::InvalidState`] after end of input was signaled or the
    ///   session closed
    /// - [`StreamError::Write`] if the transport rejects the frame
    pub async fn write_audio(&self, audio: impl Into<Bytes>) -> StreamResult<()> {
        let state = self.state.get();
        if state != SessionState::Connected {
            return Err(StreamError::InvalidState {
                operation: "write audio",
                state,
            });
        }

        let audio = audio.into();
        let data_len = audio.len();

        let mut sink = self.sink.lock().await;
        let sink = sink.as_mut().ok_or(StreamError::InvalidState {
            operation: "write audio",
            state: SessionState::Closed,
        })?;

        sink.send(Message::Binary(audio))
            .await
            .map_err(StreamError::Write)?;

        debug!("Sent {} bytes of audio", data_len);
        Ok(())
    }

    /// Tell the service no more audio will follow.
    ///
    /// Sends the `EOS` text frame exactly once per session; later calls, and
    /// calls after the session closed, succeed without sending anything.
    pub async fn signal_end_of_input(&self) -> StreamResult<()> {
        if !self.state.begin_end_of_input() {
            debug!("End of input already signaled (state: {})", self.state.get());
            return Ok(());
        }

        let mut sink = self.sink.lock().await;
        if let Some(sink) = sink.as_mut() {
            sink.send(Message::Text(END_OF_STREAM.into()))
                .await
                .map_err(StreamError::Write)?;
            info!("Signaled end of input");
        }

        Ok(())
    }

    /// Wait for the next transcript.
    ///
    /// Returns `Ok(None)` once the stream has ended cleanly (close code
    /// `1000`, or the connection was closed locally). A session error is
    /// returned exactly once, after every transcript received before it;
    /// subsequent calls return `Ok(None)`.
    pub async fn receive(&self) -> StreamResult<Option<TranscriptMessage>> {
        let mut transcripts = self.transcripts.lock().await;
        match transcripts.recv().await {
            Some(Ok(message)) => Ok(Some(message)),
            Some(Err(err)) => Err(err),
            None => Ok(None),
        }
    }

    /// Close the socket and stop the receive loop.
    ///
    /// Idempotent, and safe to call after the receive loop already ended.
    /// Transport failures while closing are logged, not returned.
    pub async fn close(&self) -> StreamResult<()> {
        let previous = self.state.close();
        self.shutdown.cancel();

        if shut_down_sink(&self.sink).await {
            info!("Closed streaming session (state: {})", previous);
        }

        let handle = self.receive_handle.lock().take();
        if let Some(mut handle) = handle
            && timeout(RECEIVE_LOOP_SHUTDOWN_TIMEOUT, &mut handle).await.is_err()
        {
            debug!("Receive loop did not stop in time, aborting");
            handle.abort();
        }

        Ok(())
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("state", &self.state.get())
            .field("session_id", &*self.session_id.read())
            .finish_non_exhaustive()
    }
}
