use std::path::PathBuf;

use thiserror::Error;

pub type ClientConfigResult<T> = Result<T, ClientConfigError>;

/// Errors raised while loading client configuration.
#[derive(Debug, Error)]
pub enum ClientConfigError {
    #[error("Missing access token: set REVAI_ACCESS_TOKEN or `access_token` in the config file")]
    MissingAccessToken,

    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: &'static str, message: String },

    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}
