//! Entity payloads as they appear on the wire
//!
//! Snapcast nests clients inside their group in `Server.GetStatus`, so the
//! group is the unit of membership here. Every field the bridge does not
//! strictly need is defaulted; servers of different versions omit different
//! parts of the document.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// `{"server": {...}}` wrapper used by `Server.GetStatus`, `Group.SetClients`
/// and the `Server.OnUpdate` notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEnvelope {
    pub server: ServerStatus,
}

/// Full server state document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerStatus {
    #[serde(default)]
    pub groups: Vec<GroupPayload>,
    #[serde(default)]
    pub server: ServerInfo,
    #[serde(default)]
    pub streams: Vec<StreamPayload>,
}

impl ServerStatus {
    /// Version string reported by the snapserver, if any
    pub fn version(&self) -> Option<&str> {
        let version = self.server.snapserver.version.as_str();
        (!version.is_empty()).then_some(version)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerInfo {
    #[serde(default)]
    pub host: HostInfo,
    #[serde(default)]
    pub snapserver: SnapserverInfo,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapserverInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default, rename = "protocolVersion")]
    pub protocol_version: u32,
    #[serde(default, rename = "controlProtocolVersion")]
    pub control_protocol_version: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub ip: String,
    #[serde(default)]
    pub mac: String,
    #[serde(default)]
    pub os: String,
    #[serde(default)]
    pub arch: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupPayload {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub muted: bool,
    #[serde(default)]
    pub stream_id: String,
    #[serde(default)]
    pub clients: Vec<ClientPayload>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientPayload {
    pub id: String,
    #[serde(default)]
    pub connected: bool,
    #[serde(default)]
    pub config: ClientConfig,
    #[serde(default)]
    pub host: HostInfo,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub volume: ClientVolume,
    #[serde(default)]
    pub latency: i32,
    #[serde(default)]
    pub instance: u32,
}

/// Client volume as carried by `Client.SetVolume` and `Client.OnVolumeChanged`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientVolume {
    #[serde(default)]
    pub muted: bool,
    #[serde(default)]
    pub percent: u8,
}

impl ClientVolume {
    pub fn new(percent: u8, muted: bool) -> Self {
        Self { muted, percent }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamPayload {
    pub id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub uri: StreamUri,
}

impl StreamPayload {
    /// Friendly name from the stream URI's `name` query parameter
    pub fn name(&self) -> Option<&str> {
        self.uri
            .query
            .get("name")
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamUri {
    #[serde(default)]
    pub raw: String,
    #[serde(default)]
    pub scheme: String,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub fragment: String,
    #[serde(default)]
    pub query: Map<String, Value>,
}
