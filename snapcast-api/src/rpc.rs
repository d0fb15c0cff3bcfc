//! JSON-RPC 2.0 framing
//!
//! The control connection carries one JSON document per line. A document is
//! a single frame or a batch (JSON array) of frames. Frames with an `id` and
//! a `result`/`error` member are responses; frames with a `method` and no id
//! are notifications. Each element of a batch decodes on its own, so one
//! broken element never hides the others.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ApiError, Result};
use crate::operation::Operation;

pub const JSONRPC_VERSION: &str = "2.0";

/// Correlation token for a request/response pair
pub type RequestId = u64;

/// Error object carried by a failed response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl From<RpcError> for ApiError {
    fn from(error: RpcError) -> Self {
        ApiError::RpcError {
            code: error.code,
            message: error.message,
        }
    }
}

#[derive(Debug, Serialize)]
struct RequestFrame {
    id: RequestId,
    jsonrpc: &'static str,
    method: &'static str,
    #[serde(skip_serializing_if = "Value::is_null")]
    params: Value,
}

/// Response to a request we issued
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub id: RequestId,
    pub outcome: std::result::Result<Value, RpcError>,
}

/// Unsolicited server message
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub method: String,
    pub params: Value,
}

/// One decoded inbound frame
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Response(Response),
    Notification(Notification),
    /// An element that is not a valid frame; `id` is kept when readable so
    /// the matching request can still be failed
    Malformed {
        id: Option<RequestId>,
        reason: String,
    },
}

/// Encode a request as a single line (without the trailing newline)
pub fn encode_request(id: RequestId, operation: &Operation) -> Result<String> {
    let frame = RequestFrame {
        id,
        jsonrpc: JSONRPC_VERSION,
        method: operation.method(),
        params: operation.params(),
    };
    Ok(serde_json::to_string(&frame)?)
}

/// Decode one inbound line into its frames
///
/// Fails only when the line is not JSON at all. Elements that are JSON but
/// not valid frames come back as [`Frame::Malformed`].
pub fn decode_frames(line: &str) -> Result<Vec<Frame>> {
    let document: Value = serde_json::from_str(line.trim())?;
    Ok(match document {
        Value::Array(items) => items.into_iter().map(decode_frame).collect(),
        other => vec![decode_frame(other)],
    })
}

fn decode_frame(value: Value) -> Frame {
    let id = value.get("id").and_then(Value::as_u64);
    match decode_object(value) {
        Ok(frame) => frame,
        Err(e) => Frame::Malformed {
            id,
            reason: e.to_string(),
        },
    }
}

fn decode_object(value: Value) -> Result<Frame> {
    let Value::Object(mut object) = value else {
        return Err(ApiError::ParseError("frame is not a JSON object".to_string()));
    };

    if let Some(version) = object.get("jsonrpc") {
        if version != JSONRPC_VERSION {
            return Err(ApiError::ParseError(format!("unsupported jsonrpc version {}", version)));
        }
    }

    match object.remove("id") {
        Some(Value::Null) | None => {
            let method = match object.remove("method") {
                Some(Value::String(method)) => method,
                _ => {
                    return Err(ApiError::ParseError(
                        "frame has neither an id nor a method".to_string(),
                    ))
                }
            };
            let params = object.remove("params").unwrap_or(Value::Null);
            Ok(Frame::Notification(Notification { method, params }))
        }
        Some(id) => {
            let id = id
                .as_u64()
                .ok_or_else(|| ApiError::ParseError(format!("unsupported response id {}", id)))?;

            let outcome = match (object.remove("result"), object.remove("error")) {
                (Some(_), Some(_)) => {
                    return Err(ApiError::ParseError(
                        "response carries both result and error".to_string(),
                    ))
                }
                (None, Some(error)) => {
                    Err(serde_json::from_value::<RpcError>(error).unwrap_or_else(|e| RpcError {
                        code: INVALID_RESPONSE,
                        message: format!("malformed error object: {}", e),
                        data: None,
                    }))
                }
                (Some(result), None) => Ok(result),
                (None, None) => Err(RpcError {
                    code: INVALID_RESPONSE,
                    message: "response carries neither result nor error".to_string(),
                    data: None,
                }),
            };

            Ok(Frame::Response(Response { id, outcome }))
        }
    }
}

/// Code used locally for responses that do not follow JSON-RPC
pub const INVALID_RESPONSE: i64 = -32600;
