//! Error types for the application.

use std::time::Duration;

use thiserror::Error;

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {message}")]
    ParseError { message: String },

    #[error("Config validation failed: {message}")]
    ValidationError { message: String },
}

/// Connection-related errors (chat transport).
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Failed to connect to {host}:{port}: {source}")]
    ConnectFailed {
        host: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("TLS handshake with {host} failed: {message}")]
    Tls { host: String, message: String },

    #[error("Server closed the link: {reason}")]
    ServerError { reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// IRC wire-format errors.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Line too long: {len} bytes (max {max})")]
    LineTooLong { len: usize, max: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Page summarizer errors.
#[derive(Debug, Error)]
pub enum SummarizeError {
    #[error("Request timed out")]
    Timeout,

    #[error("Request failed: {0}")]
    Request(String),
}

impl From<reqwest::Error> for SummarizeError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SummarizeError::Timeout
        } else {
            SummarizeError::Request(e.to_string())
        }
    }
}

/// Scores store errors.
#[derive(Debug, Error)]
pub enum ScoresError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Host probe errors.
#[derive(Debug, Error)]
pub enum PingError {
    #[error("invalid host '{0}'")]
    InvalidHost(String),

    #[error("probe timed out after {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Spawn(#[from] std::io::Error),
}

/// Result type alias for connection operations.
pub type ConnectionResult<T> = std::result::Result<T, ConnectionError>;
