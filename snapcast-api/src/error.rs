use thiserror::Error;

/// Errors raised while encoding or decoding Snapcast control frames
///
/// These describe the wire contract only. Connection-level failures
/// (lost transport, timeouts) belong to the session layer.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Frame could not be parsed
    ///
    /// Covers malformed JSON, frames that are neither a response nor a
    /// notification, and payloads whose shape does not match the method.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// The server answered a request with a JSON-RPC error object
    #[error("RPC error {code}: {message}")]
    RpcError { code: i64, message: String },

    /// Response payload did not match what the method promises
    #[error("Unexpected response to {method}: {reason}")]
    UnexpectedResponse {
        method: &'static str,
        reason: String,
    },

    /// Invalid parameter value
    ///
    /// Returned by `Operation::validate` before anything touches the wire,
    /// e.g. a volume above 100 or an empty identifier.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

impl ApiError {
    pub fn unexpected(method: &'static str, reason: impl Into<String>) -> Self {
        Self::UnexpectedResponse {
            method,
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(error: serde_json::Error) -> Self {
        ApiError::ParseError(error.to_string())
    }
}

/// Type alias for results that can return an ApiError
pub type Result<T> = std::result::Result<T, ApiError>;
