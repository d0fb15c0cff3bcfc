//! Client type

use super::{ClientId, GroupId};
use serde::{Deserialize, Serialize};

/// An audio output endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    /// Server-assigned identifier
    pub id: ClientId,
    /// Name configured on the server, if any
    pub name: Option<String>,
    /// Hostname the client reported when it connected
    pub host_name: Option<String>,
    /// Volume (0-100)
    pub volume: u8,
    /// Client-level mute, independent of the group mute
    pub muted: bool,
    /// Whether the client is currently connected to the server
    pub connected: bool,
    /// The group this client belongs to
    pub group_id: GroupId,
}

impl Client {
    pub fn new(id: ClientId, group_id: GroupId) -> Self {
        Self {
            id,
            name: None,
            host_name: None,
            volume: 0,
            muted: false,
            connected: false,
            group_id,
        }
    }

    /// Configured name, then hostname, then the identifier
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.host_name.as_deref())
            .unwrap_or(self.id.as_str())
    }
}
