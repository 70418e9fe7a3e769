//! Configuration structures and loading logic

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

/// Default server port when `OLLAMA_HOST` omits one
pub const DEFAULT_PORT: u16 = 11434;

/// Client configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the model server
    pub host: String,
    /// Deadline for blob probes and non-streamed create calls
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// Size of each chunk read from disk while hashing and uploading
    pub upload_chunk_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            timeout_secs: default_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            upload_chunk_size: default_upload_chunk_size(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from file with environment variable overrides
    pub fn load(path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = path {
            let content = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::Read {
                    path: path.clone(),
                    message: e.to_string(),
                })?;
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?
        } else {
            Self::default()
        };

        // Environment variable overrides
        if let Ok(host) = std::env::var("OLLAMA_HOST") {
            config.host = normalize_host(&host);
        }
        if let Ok(timeout) = std::env::var("MODELFILE_CLIENT_TIMEOUT") {
            config.timeout_secs = timeout
                .parse()
                .map_err(|_| ConfigError::InvalidEnv("MODELFILE_CLIENT_TIMEOUT", timeout))?;
        }
        if let Ok(chunk) = std::env::var("MODELFILE_CLIENT_CHUNK_SIZE") {
            config.upload_chunk_size = chunk
                .parse()
                .map_err(|_| ConfigError::InvalidEnv("MODELFILE_CLIENT_CHUNK_SIZE", chunk))?;
        }

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.base_url()?;

        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeout_secs must be > 0".to_string()));
        }
        if self.connect_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "connect_timeout_secs must be > 0".to_string(),
            ));
        }
        if self.upload_chunk_size == 0 {
            return Err(ConfigError::Invalid(
                "upload_chunk_size must be > 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Parsed server URL, always ending in `/` so endpoints join beneath it
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        let mut url = Url::parse(&self.host)
            .map_err(|e| ConfigError::InvalidUrl(self.host.clone(), e.to_string()))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::InvalidUrl(
                self.host.clone(),
                format!("unsupported scheme '{}'", url.scheme()),
            ));
        }

        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }

        Ok(url)
    }
}

/// Expand the shorthand forms accepted in `OLLAMA_HOST`
///
/// `0.0.0.0` becomes `http://0.0.0.0:11434` and `example.com:8080` gains a
/// scheme. The default port is only added to bare hosts; a URL with a scheme
/// keeps the scheme's own port.
pub fn normalize_host(raw: &str) -> String {
    let raw = raw.trim().trim_end_matches('/');
    if raw.contains("://") {
        return raw.to_string();
    }

    let (authority, path) = match raw.find('/') {
        Some(idx) => raw.split_at(idx),
        None => (raw, ""),
    };

    // IPv6 literals keep their colons inside brackets, so "[::1]" has no port
    let has_port = authority
        .rsplit_once(':')
        .is_some_and(|(_, port)| port.parse::<u16>().is_ok());

    if has_port {
        format!("http://{}{}", authority, path)
    } else {
        format!("http://{}:{}{}", authority, DEFAULT_PORT, path)
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {message}", path.display())]
    Read { path: PathBuf, message: String },
    #[error("failed to parse TOML config: {0}")]
    Parse(String),
    #[error("invalid value for {0}: {1}")]
    InvalidEnv(&'static str, String),
    #[error("invalid URL {0}: {1}")]
    InvalidUrl(String, String),
    #[error("{0}")]
    Invalid(String),
}

// Default functions
fn default_host() -> String {
    format!("http://127.0.0.1:{}", DEFAULT_PORT)
}
fn default_timeout() -> u64 {
    30
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_upload_chunk_size() -> usize {
    1 << 20
}
