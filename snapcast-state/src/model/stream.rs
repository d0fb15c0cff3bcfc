//! Stream type

use super::{StreamId, StreamStatus};
use serde::{Deserialize, Serialize};

/// A named audio source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stream {
    pub id: StreamId,
    /// Friendly name from the stream URI, if any
    pub name: Option<String>,
    pub status: StreamStatus,
}

impl Stream {
    pub fn new(id: StreamId, status: StreamStatus) -> Self {
        Self {
            id,
            name: None,
            status,
        }
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(self.id.as_str())
    }

    /// Selector label in the form `"name : status"`
    pub fn label(&self) -> String {
        format!("{} : {}", self.display_name(), self.status)
    }
}
