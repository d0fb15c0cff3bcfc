//! Event decoder - converts wire payloads into cache events
//!
//! Notifications and command acknowledgements both end up as
//! [`StateEvent`]s, so the cache has a single way to change.

use snapcast_api::{
    ClientPayload, ClientVolume, GroupPayload, Operation, OperationResult, ServerEvent,
    ServerStatus, StreamPayload, MAX_VOLUME,
};

use crate::cache::Snapshot;
use crate::event::StateEvent;
use crate::model::{Client, ClientId, Group, GroupId, Stream, StreamId, StreamStatus};

/// Build a normalized snapshot from a full state document
pub fn snapshot_from_status(status: &ServerStatus) -> Snapshot {
    let groups = status.groups.iter().map(decode_group).collect();
    let clients = status
        .groups
        .iter()
        .flat_map(|group| {
            group
                .clients
                .iter()
                .map(move |client| decode_client(client, &group.id))
        })
        .collect();
    let streams = status.streams.iter().map(decode_stream).collect();

    Snapshot::from_parts(
        status.version().map(str::to_string),
        groups,
        clients,
        streams,
    )
}

/// Translate a server notification into cache events
pub fn decode_event(event: ServerEvent) -> Vec<StateEvent> {
    match event {
        ServerEvent::ClientVolumeChanged { client_id, volume } => {
            vec![StateEvent::ClientVolumeChanged {
                client_id: ClientId::new(client_id),
                volume: percent(&volume),
                muted: volume.muted,
            }]
        }
        ServerEvent::ClientConnected { client_id, client } => {
            client_presence(ClientId::new(client_id), &client, true)
        }
        ServerEvent::ClientDisconnected { client_id, client } => {
            client_presence(ClientId::new(client_id), &client, false)
        }
        ServerEvent::ClientNameChanged { client_id, name } => {
            vec![StateEvent::ClientNameChanged {
                client_id: ClientId::new(client_id),
                name: non_empty(&name),
            }]
        }
        ServerEvent::GroupMuteChanged { group_id, muted } => vec![StateEvent::GroupMuteChanged {
            group_id: GroupId::new(group_id),
            muted,
        }],
        ServerEvent::GroupStreamChanged {
            group_id,
            stream_id,
        } => vec![StateEvent::GroupStreamChanged {
            group_id: GroupId::new(group_id),
            stream_id: StreamId::new(stream_id),
        }],
        ServerEvent::GroupNameChanged { group_id, name } => vec![StateEvent::GroupNameChanged {
            group_id: GroupId::new(group_id),
            name: non_empty(&name),
        }],
        ServerEvent::StreamUpdated { stream_id, stream } => {
            let stream_id = StreamId::new(stream_id);
            vec![
                StateEvent::StreamStatusChanged {
                    stream_id: stream_id.clone(),
                    status: StreamStatus::from_wire(&stream.status),
                },
                StateEvent::StreamNameChanged {
                    stream_id,
                    name: stream.name().and_then(non_empty),
                },
            ]
        }
        ServerEvent::ServerUpdated(status) => {
            vec![StateEvent::FullState(Box::new(snapshot_from_status(&status)))]
        }
        ServerEvent::Unknown { method } => {
            tracing::debug!(%method, "ignoring unhandled notification");
            Vec::new()
        }
    }
}

/// Whether a notification refers to something only a full pull can add
///
/// A client connecting for the first time is not in the cache yet, and the
/// notification does not say which group the server put it in. A stream
/// update for an unseen id means a source was added on the server.
pub fn needs_resync(event: &ServerEvent, snapshot: &Snapshot) -> bool {
    match event {
        ServerEvent::ClientConnected { client_id, .. } => {
            snapshot.client(&ClientId::new(client_id.as_str())).is_none()
        }
        ServerEvent::StreamUpdated { stream_id, .. } => {
            snapshot.stream(&StreamId::new(stream_id.as_str())).is_none()
        }
        _ => false,
    }
}

/// Cache events implied by a successful command acknowledgement
///
/// Applying these before replying means a caller that reads the snapshot
/// after its command returned sees the command's effect.
pub fn decode_ack(operation: &Operation, result: &OperationResult) -> Vec<StateEvent> {
    match (operation, result) {
        (Operation::SetClientVolume { client_id, .. }, OperationResult::Volume(volume)) => {
            vec![StateEvent::ClientVolumeChanged {
                client_id: ClientId::new(client_id.as_str()),
                volume: percent(volume),
                muted: volume.muted,
            }]
        }
        (Operation::SetGroupMute { group_id, .. }, OperationResult::Mute(muted)) => {
            vec![StateEvent::GroupMuteChanged {
                group_id: GroupId::new(group_id.as_str()),
                muted: *muted,
            }]
        }
        (Operation::SetGroupStream { group_id, .. }, OperationResult::Stream(stream_id)) => {
            vec![StateEvent::GroupStreamChanged {
                group_id: GroupId::new(group_id.as_str()),
                stream_id: StreamId::new(stream_id.as_str()),
            }]
        }
        (Operation::SetGroupClients { group_id, clients }, OperationResult::Acknowledged) => {
            let group_id = GroupId::new(group_id.as_str());
            clients
                .iter()
                .map(|client| StateEvent::ClientGroupChanged {
                    client_id: ClientId::new(client.as_str()),
                    group_id: group_id.clone(),
                })
                .collect()
        }
        (Operation::SetGroupClients { .. } | Operation::GetStatus, OperationResult::Status(status)) => {
            vec![StateEvent::FullState(Box::new(snapshot_from_status(status)))]
        }
        _ => {
            tracing::debug!(method = operation.method(), ?result, "acknowledgement carries no state");
            Vec::new()
        }
    }
}

fn client_presence(client_id: ClientId, client: &ClientPayload, connected: bool) -> Vec<StateEvent> {
    vec![
        StateEvent::ClientConnectedChanged {
            client_id: client_id.clone(),
            connected,
        },
        StateEvent::ClientVolumeChanged {
            client_id: client_id.clone(),
            volume: percent(&client.config.volume),
            muted: client.config.volume.muted,
        },
        StateEvent::ClientNameChanged {
            client_id,
            name: non_empty(&client.config.name),
        },
    ]
}

fn decode_group(group: &GroupPayload) -> Group {
    Group {
        id: GroupId::new(group.id.as_str()),
        name: non_empty(&group.name),
        muted: group.muted,
        stream_id: non_empty(&group.stream_id).map(StreamId::new),
        members: group
            .clients
            .iter()
            .map(|client| ClientId::new(client.id.as_str()))
            .collect(),
    }
}

fn decode_client(client: &ClientPayload, group_id: &str) -> Client {
    Client {
        id: ClientId::new(client.id.as_str()),
        name: non_empty(&client.config.name),
        host_name: non_empty(&client.host.name),
        volume: percent(&client.config.volume),
        muted: client.config.volume.muted,
        connected: client.connected,
        group_id: GroupId::new(group_id),
    }
}

fn decode_stream(stream: &StreamPayload) -> Stream {
    Stream {
        id: StreamId::new(stream.id.as_str()),
        name: stream.name().and_then(non_empty),
        status: StreamStatus::from_wire(&stream.status),
    }
}

/// Servers have been seen reporting more than 100
fn percent(volume: &ClientVolume) -> u8 {
    volume.percent.min(MAX_VOLUME)
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}
