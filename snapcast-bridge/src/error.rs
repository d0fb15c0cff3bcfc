//! Bridge errors
//!
//! Every failure a handler can see, classified into five kinds for display.

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use snapcast_session::SessionError;
use thiserror::Error;

/// Which kind of entity a lookup failed for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Client,
    Group,
    Stream,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EntityKind::Client => "client",
            EntityKind::Group => "group",
            EntityKind::Stream => "stream",
        })
    }
}

/// Coarse error category for presentation code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    InvalidArgument,
    ConnectionLost,
    Timeout,
    ProtocolError,
}

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Connection to snapserver lost")]
    ConnectionLost,

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Failed to start session: {0}")]
    Startup(#[source] SessionError),
}

impl BridgeError {
    pub(crate) fn not_found(kind: EntityKind, id: impl fmt::Display) -> Self {
        BridgeError::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            BridgeError::NotFound { .. } => ErrorKind::NotFound,
            BridgeError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            BridgeError::ConnectionLost | BridgeError::Startup(_) => ErrorKind::ConnectionLost,
            BridgeError::Timeout(_) => ErrorKind::Timeout,
            BridgeError::Protocol(_) => ErrorKind::ProtocolError,
        }
    }
}

impl From<SessionError> for BridgeError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::ConnectionLost => BridgeError::ConnectionLost,
            SessionError::Timeout(timeout) => BridgeError::Timeout(timeout),
            SessionError::Protocol(msg) => BridgeError::Protocol(msg),
            SessionError::InvalidRequest(msg) => BridgeError::InvalidArgument(msg),
            other @ (SessionError::Configuration(_) | SessionError::WorkerSpawn(_)) => {
                BridgeError::Startup(other)
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
