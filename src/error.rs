//! Error types for client operations

use crate::config::ConfigError;
use std::path::PathBuf;

/// Result alias used throughout the library
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors raised while resolving, uploading or creating models
///
/// Every variant aborts the surrounding `create` call. A directive that does
/// not point at a local file is not an error and never surfaces here.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The caller supplied an unusable request
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A local modelfile or referenced artifact could not be read
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Network-level failure talking to the server
    #[error("HTTP error calling {endpoint}: {source}")]
    Transport {
        endpoint: String,
        source: reqwest::Error,
    },

    /// The server answered with an unexpected status
    #[error("server {endpoint} returned {status}: {body}")]
    Api {
        endpoint: String,
        status: u16,
        body: String,
    },

    /// The server answered with a body we could not decode
    #[error("failed to decode response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },

    /// The transport cannot stream request bodies
    #[error("unsupported environment: {0}")]
    UnsupportedEnvironment(String),

    #[error("invalid blob digest: {0}")]
    InvalidDigest(String),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl ClientError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// True for the transport-level failures (network, status, decoding)
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::Api { .. } | Self::Decode { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_names_path() {
        let err = ClientError::io(
            "/models/base.bin",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        let msg = err.to_string();
        assert!(msg.contains("/models/base.bin"));
        assert!(msg.contains("gone"));
        assert!(!err.is_transport());
    }

    #[test]
    fn test_api_error_is_transport() {
        let err = ClientError::Api {
            endpoint: "HEAD /api/blobs".to_string(),
            status: 500,
            body: "boom".to_string(),
        };
        assert!(err.is_transport());
        assert_eq!(err.to_string(), "server HEAD /api/blobs returned 500: boom");
    }
}
