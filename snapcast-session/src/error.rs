use std::time::Duration;

use thiserror::Error;

/// Errors produced by the session layer
#[derive(Error, Debug)]
pub enum SessionError {
    /// The connection dropped, was never established, or the session shut
    /// down before the request completed
    #[error("Connection to snapserver lost")]
    ConnectionLost,

    /// No response arrived within the request timeout
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The server answered with an error or a malformed response
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The request was rejected before being sent
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Invalid session configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// The background worker thread could not be started
    #[error("Failed to spawn session worker: {0}")]
    WorkerSpawn(#[source] std::io::Error),
}

impl From<snapcast_api::ApiError> for SessionError {
    fn from(err: snapcast_api::ApiError) -> Self {
        match err {
            snapcast_api::ApiError::InvalidParameter(msg) => SessionError::InvalidRequest(msg),
            other => SessionError::Protocol(other.to_string()),
        }
    }
}

/// Result type for session operations
pub type Result<T> = std::result::Result<T, SessionError>;
