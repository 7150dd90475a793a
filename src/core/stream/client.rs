//! Rev.ai client and the streaming dial.

use std::sync::Arc;

use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::config::SessionConfig;
use super::connection::Connection;
use crate::config::ClientConfig;
use super::error::{DialError, StreamResult};
use crate::utils::url_redaction::redact_url;

/// Entry point for the Rev.ai API.
///
/// Holds the resolved endpoint and credential. Only the streaming service is
/// provided here; the REST endpoints (jobs, transcripts, captions, account,
/// vocabularies) are outside this crate.
#[derive(Debug, Clone)]
pub struct RevAiClient {
    config: Arc<ClientConfig>,
}

impl RevAiClient {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The streaming transcription service.
    pub fn stream(&self) -> StreamService {
        StreamService {
            config: self.config.clone(),
        }
    }
}

/// Opens streaming transcription sessions.
#[derive(Debug, Clone)]
pub struct StreamService {
    config: Arc<ClientConfig>,
}

impl StreamService {
    /// Open a streaming session.
    ///
    /// Validates `session`, builds the streaming address (adding the access
    /// token), and performs the WebSocket handshake within the configured
    /// timeout. The receive loop is already running when this returns.
    ///
    /// Cancelling `cancel` while the handshake is in flight aborts the dial.
    /// There is no retry at this layer.
    ///
    /// # Errors
    ///
    /// - [`StreamError::Config`](super::StreamError::Config) for an
    ///   invalid `session`
    /// - [`StreamError::Dial`](super::StreamError::Dial) when the
    ///   address cannot be built or the handshake fails, times out, or is
    ///   cancelled
    pub async fn dial(
        &self,
        session: &SessionConfig,
        cancel: &CancellationToken,
    ) -> StreamResult<Connection> {
        session.validate()?;

        let url = session.build_stream_url(&self.config.base_url, self.config.access_token())?;
        let handshake_timeout = self.config.handshake_timeout;

        info!("Connecting to Rev.ai streaming API: {}", redact_url(&url));

        let (ws_stream, response) = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("Streaming dial cancelled");
                return Err(DialError::Cancelled.into());
            }
            result = timeout(handshake_timeout, connect_async(url.as_str())) => match result {
                Ok(Ok(connected)) => connected,
                Ok(Err(e)) => {
                    error!("Failed to connect to Rev.ai streaming API: {}", e);
                    return Err(DialError::Handshake(e).into());
                }
                Err(_elapsed) => {
                    error!("Rev.ai streaming handshake timed out after {:?}", handshake_timeout);
                    return Err(DialError::Timeout(handshake_timeout).into());
                }
            },
        };

        debug!("Handshake completed with status {}", response.status());

        let connection = Connection::start(ws_stream, self.config.queue_capacity);
        info!("Connected to Rev.ai streaming API");
        Ok(connection)
    }
}
