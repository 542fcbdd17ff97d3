//! TLS configuration errors.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors raised while resolving or applying TLS options.
#[derive(Debug, Error)]
pub enum SslError {
    /// Unknown type or clientAuth literal, missing required key. Fatal at startup.
    #[error("SSL configuration error: {0}")]
    Configuration(String),

    /// A certificate or key path did not resolve to a file or embedded resource.
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    /// The peer did not present a verified certificate.
    #[error("Peer unverified: {0}")]
    PeerUnverified(String),

    #[error("TLS error: {0}")]
    Tls(#[from] rustls::Error),

    #[error("OpenSSL error: {0}")]
    OpenSsl(#[from] openssl::error::ErrorStack),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ConfigError> for SslError {
    fn from(err: ConfigError) -> Self {
        SslError::Configuration(err.to_string())
    }
}

/// Result type for TLS configuration operations.
pub type SslResult<T> = Result<T, SslError>;
