//! Group type

use super::{ClientId, GroupId, StreamId};
use serde::{Deserialize, Serialize};

/// A set of clients that play the same stream or are muted together
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Unique group identifier
    pub id: GroupId,
    /// Name configured on the server, if any
    pub name: Option<String>,
    /// Whether the whole group is muted
    pub muted: bool,
    /// Selected stream; only meaningful while not muted
    pub stream_id: Option<StreamId>,
    /// Member clients in server order
    pub members: Vec<ClientId>,
}

impl Group {
    pub fn new(id: GroupId) -> Self {
        Self {
            id,
            name: None,
            muted: false,
            stream_id: None,
            members: Vec::new(),
        }
    }

    /// Configured name, falling back to the identifier
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(self.id.as_str())
    }

    pub fn contains(&self, client_id: &ClientId) -> bool {
        self.members.contains(client_id)
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Stream the group is actually playing, `None` while muted
    pub fn active_stream(&self) -> Option<&StreamId> {
        if self.muted {
            None
        } else {
            self.stream_id.as_ref()
        }
    }
}
