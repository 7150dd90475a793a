use serde::Deserialize;
use std::path::Path;

use super::error::{ClientConfigError, ClientConfigResult};

/// Complete YAML configuration structure
///
/// All fields are optional to allow partial configuration. Values set here
/// take priority over environment variables.
///
/// # Example YAML structure
/// ```yaml
/// service:
///   base_url: "https://api.rev.ai"
///   access_token: "your-access-token"
///
/// streaming:
///   handshake_timeout_secs: 45
///   queue_capacity: 256
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub service: Option<ServiceYaml>,
    pub streaming: Option<StreamingYaml>,
}

/// Service endpoint and credential from YAML
#[derive(Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServiceYaml {
    pub base_url: Option<String>,
    pub access_token: Option<String>,
}

impl std::fmt::Debug for ServiceYaml {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceYaml")
            .field("base_url", &self.base_url)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

/// Streaming session limits from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct StreamingYaml {
    pub handshake_timeout_secs: Option<u64>,
    pub queue_capacity: Option<usize>,
}

impl YamlConfig {
    /// Load configuration from a YAML file
    pub fn from_file(path: &Path) -> ClientConfigResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| ClientConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        serde_yaml::from_str(&contents).map_err(|source| ClientConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })
    }
}
