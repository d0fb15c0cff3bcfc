//! Stream playback status

use serde::{Deserialize, Serialize};
use std::fmt;

/// Playback status reported for a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StreamStatus {
    /// Source is producing no audio
    Idle,
    /// Source is producing audio
    Playing,
    /// Source is disabled in the server config
    Disabled,
    /// Anything the server reports that we do not recognize
    #[default]
    Unknown,
}

impl StreamStatus {
    /// Parse from the snapserver's status string
    pub fn from_wire(status: &str) -> Self {
        match status.to_ascii_lowercase().as_str() {
            "idle" => StreamStatus::Idle,
            "playing" => StreamStatus::Playing,
            "disabled" => StreamStatus::Disabled,
            _ => StreamStatus::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StreamStatus::Idle => "idle",
            StreamStatus::Playing => "playing",
            StreamStatus::Disabled => "disabled",
            StreamStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for StreamStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
