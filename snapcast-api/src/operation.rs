//! Typed control operations
//!
//! Each variant maps to one JSON-RPC method. `params()` builds the request
//! payload, `parse_result()` turns the `result` member of the matching
//! response into an [`OperationResult`].

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{ApiError, Result};
use crate::payload::{ClientVolume, ServerStatus, StatusEnvelope};

/// Highest volume the server accepts
pub const MAX_VOLUME: u8 = 100;

/// Requests the bridge can issue to the snapserver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// `Server.GetStatus`: full state pull
    GetStatus,
    /// `Client.SetVolume`
    SetClientVolume {
        client_id: String,
        volume: ClientVolume,
    },
    /// `Group.SetMute`
    SetGroupMute { group_id: String, mute: bool },
    /// `Group.SetStream`
    SetGroupStream { group_id: String, stream_id: String },
    /// `Group.SetClients`: the full member list; the server removes listed
    /// clients from whatever group they were in before
    SetGroupClients {
        group_id: String,
        clients: Vec<String>,
    },
}

/// Decoded `result` of a successful response
#[derive(Debug, Clone, PartialEq)]
pub enum OperationResult {
    /// Full server state (`Server.GetStatus`, `Group.SetClients`)
    Status(Box<ServerStatus>),
    /// Volume echoed back by `Client.SetVolume`
    Volume(ClientVolume),
    /// Mute flag echoed back by `Group.SetMute`
    Mute(bool),
    /// Stream id echoed back by `Group.SetStream`
    Stream(String),
    /// Success without a usable payload
    Acknowledged,
}

impl Operation {
    /// JSON-RPC method name
    pub fn method(&self) -> &'static str {
        match self {
            Operation::GetStatus => "Server.GetStatus",
            Operation::SetClientVolume { .. } => "Client.SetVolume",
            Operation::SetGroupMute { .. } => "Group.SetMute",
            Operation::SetGroupStream { .. } => "Group.SetStream",
            Operation::SetGroupClients { .. } => "Group.SetClients",
        }
    }

    /// Request params, `Null` when the method takes none
    pub fn params(&self) -> Value {
        match self {
            Operation::GetStatus => Value::Null,
            Operation::SetClientVolume { client_id, volume } => {
                json!({ "id": client_id, "volume": volume })
            }
            Operation::SetGroupMute { group_id, mute } => json!({ "id": group_id, "mute": mute }),
            Operation::SetGroupStream {
                group_id,
                stream_id,
            } => json!({ "id": group_id, "stream_id": stream_id }),
            Operation::SetGroupClients { group_id, clients } => {
                json!({ "id": group_id, "clients": clients })
            }
        }
    }

    /// Boundary validation before anything is written to the wire
    pub fn validate(&self) -> Result<()> {
        match self {
            Operation::GetStatus => Ok(()),
            Operation::SetClientVolume { client_id, volume } => {
                require_id("client id", client_id)?;
                if volume.percent > MAX_VOLUME {
                    return Err(ApiError::InvalidParameter(format!(
                        "volume {} is out of range [0, {}]",
                        volume.percent, MAX_VOLUME
                    )));
                }
                Ok(())
            }
            Operation::SetGroupMute { group_id, .. } => require_id("group id", group_id),
            Operation::SetGroupStream {
                group_id,
                stream_id,
            } => {
                require_id("group id", group_id)?;
                require_id("stream id", stream_id)
            }
            Operation::SetGroupClients { group_id, clients } => {
                require_id("group id", group_id)?;
                clients.iter().try_for_each(|id| require_id("client id", id))
            }
        }
    }

    /// Decode the `result` member of this operation's response
    pub fn parse_result(&self, result: Value) -> Result<OperationResult> {
        let method = self.method();
        match self {
            Operation::GetStatus => {
                let envelope: StatusEnvelope = serde_json::from_value(result)
                    .map_err(|e| ApiError::unexpected(method, e.to_string()))?;
                Ok(OperationResult::Status(Box::new(envelope.server)))
            }
            Operation::SetClientVolume { .. } => {
                #[derive(Deserialize)]
                struct VolumeResult {
                    volume: ClientVolume,
                }
                let parsed: VolumeResult = serde_json::from_value(result)
                    .map_err(|e| ApiError::unexpected(method, e.to_string()))?;
                Ok(OperationResult::Volume(parsed.volume))
            }
            Operation::SetGroupMute { .. } => {
                #[derive(Deserialize)]
                struct MuteResult {
                    mute: bool,
                }
                let parsed: MuteResult = serde_json::from_value(result)
                    .map_err(|e| ApiError::unexpected(method, e.to_string()))?;
                Ok(OperationResult::Mute(parsed.mute))
            }
            Operation::SetGroupStream { .. } => {
                #[derive(Deserialize)]
                struct StreamResult {
                    stream_id: String,
                }
                let parsed: StreamResult = serde_json::from_value(result)
                    .map_err(|e| ApiError::unexpected(method, e.to_string()))?;
                Ok(OperationResult::Stream(parsed.stream_id))
            }
            Operation::SetGroupClients { .. } => {
                // Older servers answer with an empty object instead of the
                // full state document.
                if result.get("server").is_none() {
                    return Ok(OperationResult::Acknowledged);
                }
                let envelope: StatusEnvelope = serde_json::from_value(result)
                    .map_err(|e| ApiError::unexpected(method, e.to_string()))?;
                Ok(OperationResult::Status(Box::new(envelope.server)))
            }
        }
    }
}

fn require_id(what: &str, id: &str) -> Result<()> {
    if id.trim().is_empty() {
        return Err(ApiError::InvalidParameter(format!("{} must not be empty", what)));
    }
    Ok(())
}
