//! Session configuration and streaming address construction.

use url::Url;

use super::error::{DialError, StreamError};

/// Path of the streaming endpoint on the service host.
pub const STREAM_PATH: &str = "/speechtotext/v1/stream";

/// Per-session options supplied at dial time.
///
/// The access token is not part of this struct: the stream service adds it
/// when it builds the connection address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionConfig {
    /// Content type of the audio, e.g. `audio/x-wav` or a raw
    /// `audio/x-raw;layout=interleaved;rate=16000;format=S16LE;channels=1` descriptor.
    /// Required.
    pub content_type: String,

    /// Free-form metadata echoed back by the service. Omitted when empty.
    pub metadata: Option<String>,

    /// Mask profanity in transcripts.
    pub filter_profanity: bool,

    /// Drop disfluencies ("um", "uh") from transcripts.
    pub remove_disfluencies: bool,

    /// Id of a previously submitted custom vocabulary. Omitted when empty.
    pub custom_vocabulary_id: Option<String>,
}

impl SessionConfig {
    pub fn new(content_type: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
            ..Default::default()
        }
    }

    pub fn with_metadata(mut self, metadata: impl Into<String>) -> Self {
        self.metadata = Some(metadata.into());
        self
    }

    pub fn with_filter_profanity(mut self, enabled: bool) -> Self {
        self.filter_profanity = enabled;
        self
    }

    pub fn with_remove_disfluencies(mut self, enabled: bool) -> Self {
        self.remove_disfluencies = enabled;
        self
    }

    pub fn with_custom_vocabulary_id(mut self, id: impl Into<String>) -> Self {
        self.custom_vocabulary_id = Some(id.into());
        self
    }

    /// Reject configurations the service would refuse with close code 4002.
    pub fn validate(&self) -> Result<(), StreamError> {
        if self.content_type.trim().is_empty() {
            return Err(StreamError::Config(
                "content_type is required for a streaming session".to_string(),
            ));
        }
        Ok(())
    }

    /// Build the WebSocket address for this session.
    ///
    /// `https` base URLs become `wss`, `http` become `ws`; host and port are
    /// kept, path, query and fragment are replaced.
    pub fn build_stream_url(&self, base_url: &Url, access_token: &str) -> Result<Url, DialError> {
        let scheme = match base_url.scheme() {
            "https" | "wss" => "wss",
            "http" | "ws" => "ws",
            other => return Err(DialError::UnsupportedScheme(other.to_string())),
        };

        let mut url = base_url.clone();
        url.set_scheme(scheme)
            .map_err(|_| DialError::UnsupportedScheme(base_url.scheme().to_string()))?;
        url.set_path(STREAM_PATH);
        url.set_query(None);
        url.set_fragment(None);

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("content_type", &self.content_type);
            if let Some(metadata) = non_empty(&self.metadata) {
                query.append_pair("metadata", metadata);
            }
            if self.remove_disfluencies {
                query.append_pair("remove_disfluencies", "true");
            }
            query.append_pair(
                "filter_profanity",
                if self.filter_profanity { "true" } else { "false" },
            );
            if let Some(id) = non_empty(&self.custom_vocabulary_id) {
                query.append_pair("custom_vocabulary_id", id);
            }
            query.append_pair("access_token", access_token);
        }

        Ok(url)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}
