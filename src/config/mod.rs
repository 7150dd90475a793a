//! Client configuration.
//!
//! Resolves the service endpoint and access credential handed to the stream
//! service. Sources, highest priority first: YAML file > environment
//! variables > defaults. `.env` files are loaded into the environment by the
//! binary before any of this runs.
//!
//! # Environment variables
//! - `REVAI_ACCESS_TOKEN` (required unless set in YAML)
//! - `REVAI_BASE_URL` (default `https://api.rev.ai`)
//! - `REVAI_HANDSHAKE_TIMEOUT_SECS` (default 45)
//! - `REVAI_QUEUE_CAPACITY` (default 256)
//!
//! # Example
//! ```rust,no_run
//! use revai_stream::config::ClientConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ClientConfig::from_env()?;
//!
//! // Load from YAML file with environment variable fallback
//! let config = ClientConfig::from_file(&PathBuf::from("revai.yaml"))?;
//!
//! println!("Streaming against {}", config.base_url);
//! # Ok(())
//! # }
//! ```

use std::path::Path;
use std::time::Duration;

use url::Url;

mod error;
mod yaml;

pub use error::{ClientConfigError, ClientConfigResult};
pub use yaml::{ServiceYaml, StreamingYaml, YamlConfig};

pub const DEFAULT_BASE_URL: &str = "https://api.rev.ai";
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(45);
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

pub const ENV_ACCESS_TOKEN: &str = "REVAI_ACCESS_TOKEN";
pub const ENV_BASE_URL: &str = "REVAI_BASE_URL";
pub const ENV_HANDSHAKE_TIMEOUT_SECS: &str = "REVAI_HANDSHAKE_TIMEOUT_SECS";
pub const ENV_QUEUE_CAPACITY: &str = "REVAI_QUEUE_CAPACITY";

/// Resolved endpoint and credential for the Rev.ai API.
#[derive(Clone)]
pub struct ClientConfig {
    /// Service base URL; `https` is dialed as `wss`
    pub base_url: Url,

    access_token: String,

    /// Bound on the WebSocket handshake
    pub handshake_timeout: Duration,

    /// Capacity of each session's transcript queue
    pub queue_capacity: usize,
}

/// Zeroize the access token when the config is dropped.
impl Drop for ClientConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;
        self.access_token.zeroize();
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url.as_str())
            .field("access_token", &"<redacted>")
            .field("handshake_timeout", &self.handshake_timeout)
            .field("queue_capacity", &self.queue_capacity)
            .finish()
    }
}

impl ClientConfig {
    /// Config for `base_url` with default limits.
    pub fn new(base_url: Url, access_token: impl Into<String>) -> Self {
        Self {
            base_url,
            access_token: access_token.into(),
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }

    pub fn with_handshake_timeout(mut self, handshake_timeout: Duration) -> Self {
        self.handshake_timeout = handshake_timeout;
        self
    }

    pub fn with_queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.queue_capacity = queue_capacity;
        self
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Load from environment variables.
    pub fn from_env() -> ClientConfigResult<Self> {
        Self::resolve(None, &EnvValues::from_env())
    }

    /// Load a YAML file, falling back to environment variables for any
    /// value the file does not set.
    pub fn from_file(path: &Path) -> ClientConfigResult<Self> {
        let yaml = YamlConfig::from_file(path)?;
        Self::resolve(Some(yaml), &EnvValues::from_env())
    }

    fn resolve(yaml: Option<YamlConfig>, env: &EnvValues) -> ClientConfigResult<Self> {
        let yaml = yaml.unwrap_or_default();
        let service = yaml.service.unwrap_or_default();
        let streaming = yaml.streaming.unwrap_or_default();

        let access_token = service
            .access_token
            .or_else(|| env.access_token.clone())
            .filter(|token| !token.trim().is_empty())
            .ok_or(ClientConfigError::MissingAccessToken)?;

        let base_url = service
            .base_url
            .or_else(|| env.base_url.clone())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let base_url = parse_base_url(&base_url)?;

        let handshake_timeout = match streaming.handshake_timeout_secs {
            Some(secs) => secs,
            None => match env.handshake_timeout_secs.as_deref() {
                Some(raw) => parse_number(ENV_HANDSHAKE_TIMEOUT_SECS, raw)?,
                None => DEFAULT_HANDSHAKE_TIMEOUT.as_secs(),
            },
        };
        if handshake_timeout == 0 {
            return Err(ClientConfigError::InvalidValue {
                key: "handshake_timeout_secs",
                message: "must be greater than zero".to_string(),
            });
        }

        let queue_capacity = match streaming.queue_capacity {
            Some(capacity) => capacity,
            None => match env.queue_capacity.as_deref() {
                Some(raw) => parse_number(ENV_QUEUE_CAPACITY, raw)?,
                None => DEFAULT_QUEUE_CAPACITY,
            },
        };
        if queue_capacity == 0 {
            return Err(ClientConfigError::InvalidValue {
                key: "queue_capacity",
                message: "must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            base_url,
            access_token,
            handshake_timeout: Duration::from_secs(handshake_timeout),
            queue_capacity,
        })
    }
}

/// Raw values read from the environment.
#[derive(Debug, Default, Clone)]
struct EnvValues {
    access_token: Option<String>,
    base_url: Option<String>,
    handshake_timeout_secs: Option<String>,
    queue_capacity: Option<String>,
}

impl EnvValues {
    fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            access_token: lookup(ENV_ACCESS_TOKEN),
            base_url: lookup(ENV_BASE_URL),
            handshake_timeout_secs: lookup(ENV_HANDSHAKE_TIMEOUT_SECS),
            queue_capacity: lookup(ENV_QUEUE_CAPACITY),
        }
    }
}

fn parse_base_url(raw: &str) -> ClientConfigResult<Url> {
    let url = Url::parse(raw).map_err(|e| ClientConfigError::InvalidValue {
        key: "base_url",
        message: e.to_string(),
    })?;

    match url.scheme() {
        "https" | "http" | "wss" | "ws" => Ok(url),
        other => Err(ClientConfigError::InvalidValue {
            key: "base_url",
            message: format!("unsupported scheme `{other}`"),
        }),
    }
}

fn parse_number<T: std::str::FromStr>(key: &'static str, raw: &str) -> ClientConfigResult<T>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e: T::Err| ClientConfigError::InvalidValue {
            key,
            message: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::collections::HashMap;
    use std::env;
    use std::io::Write;

    fn cleanup_env_vars() {
        unsafe {
            env::remove_var(ENV_ACCESS_TOKEN);
            env::remove_var(ENV_BASE_URL);
            env::remove_var(ENV_HANDSHAKE_TIMEOUT_SECS);
            env::remove_var(ENV_QUEUE_CAPACITY);
        }
    }

    fn env(pairs: &[(&str, &str)]) -> EnvValues {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        EnvValues::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults_with_token_only() {
        let config = ClientConfig::resolve(None, &env(&[(ENV_ACCESS_TOKEN, "tok")])).unwrap();

        assert_eq!(config.access_token(), "tok");
        assert_eq!(config.base_url.as_str(), "https://api.rev.ai/");
        assert_eq!(config.handshake_timeout, Duration::from_secs(45));
        assert_eq!(config.queue_capacity, 256);
    }

    #[test]
    fn test_missing_token() {
        let result = ClientConfig::resolve(None, &env(&[]));
        assert!(matches!(result, Err(ClientConfigError::MissingAccessToken)));

        let result = ClientConfig::resolve(None, &env(&[(ENV_ACCESS_TOKEN, "  ")]));
        assert!(matches!(result, Err(ClientConfigError::MissingAccessToken)));
    }

    #[test]
    fn test_env_overrides_defaults() {
        let config = ClientConfig::resolve(
            None,
            &env(&[
                (ENV_ACCESS_TOKEN, "tok"),
                (ENV_BASE_URL, "http://localhost:9000"),
                (ENV_HANDSHAKE_TIMEOUT_SECS, "5"),
                (ENV_QUEUE_CAPACITY, "16"),
            ]),
        )
        .unwrap();

        assert_eq!(config.base_url.as_str(), "http://localhost:9000/");
        assert_eq!(config.handshake_timeout, Duration::from_secs(5));
        assert_eq!(config.queue_capacity, 16);
    }

    #[test]
    fn test_invalid_env_values() {
        let result = ClientConfig::resolve(
            None,
            &env(&[(ENV_ACCESS_TOKEN, "tok"), (ENV_HANDSHAKE_TIMEOUT_SECS, "soon")]),
        );
        assert!(matches!(
            result,
            Err(ClientConfigError::InvalidValue { key: ENV_HANDSHAKE_TIMEOUT_SECS, .. })
        ));

        let result = ClientConfig::resolve(
            None,
            &env(&[(ENV_ACCESS_TOKEN, "tok"), (ENV_QUEUE_CAPACITY, "0")]),
        );
        assert!(matches!(
            result,
            Err(ClientConfigError::InvalidValue { key: "queue_capacity", .. })
        ));

        let result = ClientConfig::resolve(
            None,
            &env(&[(ENV_ACCESS_TOKEN, "tok"), (ENV_BASE_URL, "ftp://files.rev.ai")]),
        );
        assert!(matches!(
            result,
            Err(ClientConfigError::InvalidValue { key: "base_url", .. })
        ));
    }

    #[test]
    fn test_yaml_takes_priority_over_env() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "service:\n  base_url: \"https://eu.api.rev.ai\"\n  access_token: \"yaml-token\"\nstreaming:\n  handshake_timeout_secs: 10"
        )
        .unwrap();

        let yaml = YamlConfig::from_file(file.path()).unwrap();
        let config = ClientConfig::resolve(
            Some(yaml),
            &env(&[
                (ENV_ACCESS_TOKEN, "env-token"),
                (ENV_BASE_URL, "https://api.rev.ai"),
                (ENV_QUEUE_CAPACITY, "8"),
            ]),
        )
        .unwrap();

        assert_eq!(config.access_token(), "yaml-token");
        assert_eq!(config.base_url.host_str(), Some("eu.api.rev.ai"));
        assert_eq!(config.handshake_timeout, Duration::from_secs(10));
        // not set in YAML, falls back to env
        assert_eq!(config.queue_capacity, 8);
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = ClientConfig::new(Url::parse(DEFAULT_BASE_URL).unwrap(), "super-secret");
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_builders() {
        let config = ClientConfig::new(Url::parse("http://127.0.0.1:1234").unwrap(), "tok")
            .with_handshake_timeout(Duration::from_secs(1))
            .with_queue_capacity(4);

        assert_eq!(config.base_url.port(), Some(1234));
        assert_eq!(config.handshake_timeout, Duration::from_secs(1));
        assert_eq!(config.queue_capacity, 4);
    }

    #[test]
    #[serial]
    fn test_from_env() {
        cleanup_env_vars();
        unsafe {
            env::set_var(ENV_ACCESS_TOKEN, "env-token");
            env::set_var(ENV_QUEUE_CAPACITY, "32");
        }

        let config = ClientConfig::from_env().unwrap();
        assert_eq!(config.access_token(), "env-token");
        assert_eq!(config.queue_capacity, 32);
        assert_eq!(config.handshake_timeout, DEFAULT_HANDSHAKE_TIMEOUT);

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_file_falls_back_to_env() {
        cleanup_env_vars();
        unsafe {
            env::set_var(ENV_ACCESS_TOKEN, "env-token");
        }

        let temp_dir = tempfile::TempDir::new().unwrap();
        let config_path = temp_dir.path().join("revai.yaml");
        std::fs::write(&config_path, "streaming:\n  queue_capacity: 4\n").unwrap();

        let config = ClientConfig::from_file(&config_path).unwrap();
        assert_eq!(config.access_token(), "env-token");
        assert_eq!(config.queue_capacity, 4);

        cleanup_env_vars();
    }
}
