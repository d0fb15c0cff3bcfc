//! State change event types

use super::{ClientId, GroupId, StreamId, StreamStatus};
use serde::{Deserialize, Serialize};

/// What an applied event actually changed
///
/// Returned by the cache's update methods; `None` means the event was a
/// no-op or referenced an entity the cache does not know.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StateChange {
    /// Client volume or client-level mute changed
    VolumeChanged {
        client_id: ClientId,
        old_volume: u8,
        new_volume: u8,
        muted: bool,
    },

    /// Client connected or disconnected
    ConnectionChanged { client_id: ClientId, connected: bool },

    /// Client moved between groups
    ClientMoved {
        client_id: ClientId,
        from: GroupId,
        to: GroupId,
    },

    /// Client name changed
    ClientRenamed { client_id: ClientId },

    /// Group mute flag changed
    GroupMuteChanged { group_id: GroupId, muted: bool },

    /// Group switched streams
    GroupStreamChanged {
        group_id: GroupId,
        old_stream: Option<StreamId>,
        new_stream: StreamId,
    },

    /// Group name changed
    GroupRenamed { group_id: GroupId },

    /// Stream playback status changed
    StreamStatusChanged {
        stream_id: StreamId,
        old_status: StreamStatus,
        new_status: StreamStatus,
    },

    /// Stream name changed
    StreamRenamed { stream_id: StreamId },

    /// Whole state replaced by a full pull
    StateReplaced {
        clients: usize,
        groups: usize,
        streams: usize,
    },

    /// State dropped after a disconnect
    StateCleared,
}
