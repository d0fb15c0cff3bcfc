//! Normalized events the cache understands

use crate::cache::Snapshot;
use crate::model::{ClientId, GroupId, StreamId, StreamStatus};

/// A single change to the mirrored state
///
/// Produced by the decoder from server notifications and command
/// acknowledgements, consumed by [`StateCache::apply_event`].
///
/// [`StateCache::apply_event`]: crate::StateCache::apply_event
#[derive(Debug, Clone, PartialEq)]
pub enum StateEvent {
    ClientVolumeChanged {
        client_id: ClientId,
        volume: u8,
        muted: bool,
    },
    ClientConnectedChanged {
        client_id: ClientId,
        connected: bool,
    },
    /// Client now belongs to `group_id`; it leaves its previous group
    ClientGroupChanged {
        client_id: ClientId,
        group_id: GroupId,
    },
    ClientNameChanged {
        client_id: ClientId,
        name: Option<String>,
    },
    GroupMuteChanged {
        group_id: GroupId,
        muted: bool,
    },
    GroupStreamChanged {
        group_id: GroupId,
        stream_id: StreamId,
    },
    GroupNameChanged {
        group_id: GroupId,
        name: Option<String>,
    },
    StreamStatusChanged {
        stream_id: StreamId,
        status: StreamStatus,
    },
    StreamNameChanged {
        stream_id: StreamId,
        name: Option<String>,
    },
    /// Replace everything with a freshly pulled state document
    FullState(Box<Snapshot>),
}

impl StateEvent {
    /// Short name for log lines
    pub fn kind(&self) -> &'static str {
        match self {
            StateEvent::ClientVolumeChanged { .. } => "client_volume",
            StateEvent::ClientConnectedChanged { .. } => "client_connected",
            StateEvent::ClientGroupChanged { .. } => "client_group",
            StateEvent::ClientNameChanged { .. } => "client_name",
            StateEvent::GroupMuteChanged { .. } => "group_mute",
            StateEvent::GroupStreamChanged { .. } => "group_stream",
            StateEvent::GroupNameChanged { .. } => "group_name",
            StateEvent::StreamStatusChanged { .. } => "stream_status",
            StateEvent::StreamNameChanged { .. } => "stream_name",
            StateEvent::FullState(_) => "full_state",
        }
    }
}
