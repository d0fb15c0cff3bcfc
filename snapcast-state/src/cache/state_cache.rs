//! Single-writer state cache with change detection

use std::sync::Arc;

use crate::event::StateEvent;
use crate::model::{ClientId, GroupId, StateChange, StreamId, StreamStatus};

use super::{Snapshot, SnapshotHandle};

/// Authoritative in-memory mirror of the server state
///
/// Owned by exactly one writer (the session worker). Update methods return
/// `Option<StateChange>` for change detection; whenever something changed a
/// new [`Snapshot`] is published through the [`SnapshotHandle`].
#[derive(Debug, Default)]
pub struct StateCache {
    current: Snapshot,
    published: SnapshotHandle,
}

impl StateCache {
    /// Create a new empty state cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Read handle that can be cloned onto other threads
    pub fn handle(&self) -> SnapshotHandle {
        self.published.clone()
    }

    /// Last published snapshot
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.published.load()
    }

    pub fn session_id(&self) -> u64 {
        self.current.session
    }

    /// Start a new connection session with a freshly pulled state
    pub fn begin_session(&mut self, session: u64, snapshot: Snapshot) -> StateChange {
        self.current = Snapshot {
            session,
            ..snapshot
        };
        self.publish();
        tracing::debug!(
            session,
            clients = self.current.clients.len(),
            groups = self.current.groups.len(),
            streams = self.current.streams.len(),
            "state session started"
        );
        self.replaced()
    }

    /// Drop all entities after the connection is lost
    ///
    /// The session id is kept so readers can tell which session the empty
    /// view belongs to.
    pub fn clear(&mut self) -> Option<StateChange> {
        if self.current.is_empty() && self.current.server_version.is_none() {
            return None;
        }
        self.current = Snapshot {
            session: self.current.session,
            ..Snapshot::default()
        };
        self.publish();
        Some(StateChange::StateCleared)
    }

    /// Apply one event and publish the result if anything changed
    ///
    /// Events that name unknown entities are logged and ignored.
    pub fn apply_event(&mut self, event: StateEvent) -> Option<StateChange> {
        let kind = event.kind();
        let change = match event {
            StateEvent::ClientVolumeChanged {
                client_id,
                volume,
                muted,
            } => self.update_volume(&client_id, volume, muted),
            StateEvent::ClientConnectedChanged {
                client_id,
                connected,
            } => self.update_connected(&client_id, connected),
            StateEvent::ClientGroupChanged {
                client_id,
                group_id,
            } => self.move_client(&client_id, &group_id),
            StateEvent::ClientNameChanged { client_id, name } => {
                self.update_client_name(&client_id, name)
            }
            StateEvent::GroupMuteChanged { group_id, muted } => {
                self.update_group_mute(&group_id, muted)
            }
            StateEvent::GroupStreamChanged {
                group_id,
                stream_id,
            } => self.update_group_stream(&group_id, &stream_id),
            StateEvent::GroupNameChanged { group_id, name } => {
                self.update_group_name(&group_id, name)
            }
            StateEvent::StreamStatusChanged { stream_id, status } => {
                self.update_stream_status(&stream_id, status)
            }
            StateEvent::StreamNameChanged { stream_id, name } => {
                self.update_stream_name(&stream_id, name)
            }
            StateEvent::FullState(snapshot) => {
                let session = self.current.session;
                self.current = Snapshot {
                    session,
                    ..*snapshot
                };
                Some(self.replaced())
            }
        };

        match &change {
            Some(change) => {
                tracing::trace!(event = kind, ?change, "state updated");
                self.publish();
            }
            None => tracing::trace!(event = kind, "event caused no change"),
        }
        change
    }

    // ==================== Update methods with change detection ====================

    fn update_volume(&mut self, id: &ClientId, volume: u8, muted: bool) -> Option<StateChange> {
        let Some(client) = self.current.clients.get_mut(id) else {
            tracing::warn!(client_id = %id, "volume change for unknown client ignored");
            return None;
        };
        let old_volume = client.volume;

        if old_volume != volume || client.muted != muted {
            client.volume = volume;
            client.muted = muted;
            Some(StateChange::VolumeChanged {
                client_id: id.clone(),
                old_volume,
                new_volume: volume,
                muted,
            })
        } else {
            None
        }
    }

    fn update_connected(&mut self, id: &ClientId, connected: bool) -> Option<StateChange> {
        let Some(client) = self.current.clients.get_mut(id) else {
            tracing::warn!(client_id = %id, "connection change for unknown client ignored");
            return None;
        };

        if client.connected != connected {
            client.connected = connected;
            Some(StateChange::ConnectionChanged {
                client_id: id.clone(),
                connected,
            })
        } else {
            None
        }
    }

    /// Move a client into another group, keeping membership symmetric
    ///
    /// The previous group stays even if it ends up empty.
    fn move_client(&mut self, id: &ClientId, to: &GroupId) -> Option<StateChange> {
        if !self.current.groups.contains_key(to) {
            tracing::warn!(client_id = %id, group_id = %to, "move into unknown group ignored");
            return None;
        }
        let Some(client) = self.current.clients.get_mut(id) else {
            tracing::warn!(client_id = %id, group_id = %to, "move of unknown client ignored");
            return None;
        };
        if &client.group_id == to {
            return None;
        }

        let from = std::mem::replace(&mut client.group_id, to.clone());
        if let Some(old_group) = self.current.groups.get_mut(&from) {
            old_group.members.retain(|member| member != id);
        }
        if let Some(new_group) = self.current.groups.get_mut(to) {
            new_group.members.push(id.clone());
        }

        Some(StateChange::ClientMoved {
            client_id: id.clone(),
            from,
            to: to.clone(),
        })
    }

    fn update_client_name(&mut self, id: &ClientId, name: Option<String>) -> Option<StateChange> {
        let Some(client) = self.current.clients.get_mut(id) else {
            tracing::warn!(client_id = %id, "rename of unknown client ignored");
            return None;
        };

        if client.name != name {
            client.name = name;
            Some(StateChange::ClientRenamed {
                client_id: id.clone(),
            })
        } else {
            None
        }
    }

    fn update_group_mute(&mut self, id: &GroupId, muted: bool) -> Option<StateChange> {
        let Some(group) = self.current.groups.get_mut(id) else {
            tracing::warn!(group_id = %id, "mute change for unknown group ignored");
            return None;
        };

        if group.muted != muted {
            group.muted = muted;
            Some(StateChange::GroupMuteChanged {
                group_id: id.clone(),
                muted,
            })
        } else {
            None
        }
    }

    fn update_group_stream(&mut self, id: &GroupId, stream_id: &StreamId) -> Option<StateChange> {
        if !self.current.streams.contains_key(stream_id) {
            tracing::warn!(group_id = %id, stream_id = %stream_id, "switch to unknown stream ignored");
            return None;
        }
        let Some(group) = self.current.groups.get_mut(id) else {
            tracing::warn!(group_id = %id, "stream change for unknown group ignored");
            return None;
        };
        if group.stream_id.as_ref() == Some(stream_id) {
            return None;
        }

        let old_stream = group.stream_id.replace(stream_id.clone());
        Some(StateChange::GroupStreamChanged {
            group_id: id.clone(),
            old_stream,
            new_stream: stream_id.clone(),
        })
    }

    fn update_group_name(&mut self, id: &GroupId, name: Option<String>) -> Option<StateChange> {
        let Some(group) = self.current.groups.get_mut(id) else {
            tracing::warn!(group_id = %id, "rename of unknown group ignored");
            return None;
        };

        if group.name != name {
            group.name = name;
            Some(StateChange::GroupRenamed {
                group_id: id.clone(),
            })
        } else {
            None
        }
    }

    fn update_stream_status(&mut self, id: &StreamId, status: StreamStatus) -> Option<StateChange> {
        let Some(stream) = self.current.streams.get_mut(id) else {
            tracing::warn!(stream_id = %id, "status change for unknown stream ignored");
            return None;
        };
        let old_status = stream.status;

        if old_status != status {
            stream.status = status;
            Some(StateChange::StreamStatusChanged {
                stream_id: id.clone(),
                old_status,
                new_status: status,
            })
        } else {
            None
        }
    }

    fn update_stream_name(&mut self, id: &StreamId, name: Option<String>) -> Option<StateChange> {
        let Some(stream) = self.current.streams.get_mut(id) else {
            tracing::warn!(stream_id = %id, "rename of unknown stream ignored");
            return None;
        };

        if stream.name != name {
            stream.name = name;
            Some(StateChange::StreamRenamed {
                stream_id: id.clone(),
            })
        } else {
            None
        }
    }

    fn replaced(&self) -> StateChange {
        StateChange::StateReplaced {
            clients: self.current.clients.len(),
            groups: self.current.groups.len(),
            streams: self.current.streams.len(),
        }
    }

    fn publish(&self) {
        self.published.store(self.current.clone());
    }
}
