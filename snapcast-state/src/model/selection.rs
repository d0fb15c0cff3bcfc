//! What a group is set to play

use super::StreamId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Either a stream or the mute sentinel
///
/// Forms encode the choice as a single string: the stream id, or `"0"` for
/// mute.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroupSelection {
    Mute,
    Stream(StreamId),
}

impl GroupSelection {
    /// Form value that selects mute
    pub const MUTE_VALUE: &'static str = "0";

    /// Parse a form value; `None` for an empty value
    pub fn from_form_value(value: &str) -> Option<Self> {
        let value = value.trim();
        match value {
            "" => None,
            Self::MUTE_VALUE => Some(GroupSelection::Mute),
            stream => Some(GroupSelection::Stream(StreamId::new(stream))),
        }
    }

    pub fn form_value(&self) -> &str {
        match self {
            GroupSelection::Mute => Self::MUTE_VALUE,
            GroupSelection::Stream(id) => id.as_str(),
        }
    }
}

impl fmt::Display for GroupSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupSelection::Mute => f.write_str("mute"),
            GroupSelection::Stream(id) => write!(f, "stream {}", id),
        }
    }
}
