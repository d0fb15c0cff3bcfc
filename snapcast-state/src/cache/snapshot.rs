//! Immutable point-in-time view of the server's entity graph

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::Serialize;

use crate::model::{Client, ClientId, Group, GroupId, GroupSelection, Stream, StreamId};

/// Consistent view of clients, groups and streams
///
/// Every client's group resolves to a group in the same snapshot and lists
/// the client as a member; every group's stream, when set, resolves to a
/// stream in the same snapshot. [`Snapshot::from_parts`] enforces this on
/// construction and the cache preserves it on every update.
///
/// Entities keep server order, and lookups by id are O(1).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Snapshot {
    pub(crate) session: u64,
    pub(crate) server_version: Option<String>,
    pub(crate) clients: IndexMap<ClientId, Client>,
    pub(crate) groups: IndexMap<GroupId, Group>,
    pub(crate) streams: IndexMap<StreamId, Stream>,
}

/// Counts shown on an overview page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub server_version: Option<String>,
    pub clients: usize,
    pub groups: usize,
    pub streams: usize,
}

/// One entry of a group's stream selector
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectionChoice {
    pub selection: GroupSelection,
    pub label: String,
}

/// A violated snapshot invariant
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Inconsistency {
    #[error("client {client} points at missing group {group}")]
    DanglingGroup { client: ClientId, group: GroupId },
    #[error("client {client} is not listed as a member of its group {group}")]
    NotAMember { client: ClientId, group: GroupId },
    #[error("group {group} lists missing client {client}")]
    UnknownMember { group: GroupId, client: ClientId },
    #[error("client {client} is listed by more than one group")]
    SharedMember { client: ClientId },
    #[error("group {group} selects missing stream {stream}")]
    DanglingStream { group: GroupId, stream: StreamId },
}

impl Snapshot {
    /// Create an empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a snapshot, dropping anything that would break its invariants
    ///
    /// Group membership is authoritative: each client's `group_id` is taken
    /// from the first group that lists it. Clients no group lists, members
    /// that name unknown clients, duplicate groups and stream references to
    /// unknown streams are discarded with a warning.
    pub fn from_parts(
        server_version: Option<String>,
        groups: Vec<Group>,
        clients: Vec<Client>,
        streams: Vec<Stream>,
    ) -> Self {
        let streams: IndexMap<StreamId, Stream> =
            streams.into_iter().map(|s| (s.id.clone(), s)).collect();
        let mut clients: IndexMap<ClientId, Client> =
            clients.into_iter().map(|c| (c.id.clone(), c)).collect();

        let mut assigned: HashSet<ClientId> = HashSet::new();
        let mut group_map: IndexMap<GroupId, Group> = IndexMap::with_capacity(groups.len());

        for mut group in groups {
            if group_map.contains_key(&group.id) {
                tracing::warn!(group_id = %group.id, "duplicate group in state document dropped");
                continue;
            }

            if let Some(stream_id) = &group.stream_id {
                if !streams.contains_key(stream_id) {
                    tracing::warn!(group_id = %group.id, stream_id = %stream_id, "group selects unknown stream");
                    group.stream_id = None;
                }
            }

            let group_id = group.id.clone();
            group.members.retain(|member| match clients.get_mut(member) {
                Some(client) if assigned.insert(member.clone()) => {
                    client.group_id = group_id.clone();
                    true
                }
                _ => {
                    tracing::warn!(group_id = %group_id, client_id = %member, "dropping unknown or shared member");
                    false
                }
            });

            group_map.insert(group_id, group);
        }

        clients.retain(|id, _| {
            let keep = assigned.contains(id);
            if !keep {
                tracing::warn!(client_id = %id, "client without a group dropped");
            }
            keep
        });

        Self {
            session: 0,
            server_version,
            clients,
            groups: group_map,
            streams,
        }
    }

    /// Connection session that produced this view
    ///
    /// Starts at 1 for the first connection and increases on every
    /// reconnect; 0 means no session has been established. Identifiers are
    /// only comparable between snapshots with the same session.
    pub fn session_id(&self) -> u64 {
        self.session
    }

    pub fn server_version(&self) -> Option<&str> {
        self.server_version.as_deref()
    }

    // ==================== Lookups ====================

    pub fn client(&self, id: &ClientId) -> Option<&Client> {
        self.clients.get(id)
    }

    pub fn group(&self, id: &GroupId) -> Option<&Group> {
        self.groups.get(id)
    }

    pub fn stream(&self, id: &StreamId) -> Option<&Stream> {
        self.streams.get(id)
    }

    pub fn clients(&self) -> impl Iterator<Item = &Client> + '_ {
        self.clients.values()
    }

    pub fn groups(&self) -> impl Iterator<Item = &Group> + '_ {
        self.groups.values()
    }

    pub fn streams(&self) -> impl Iterator<Item = &Stream> + '_ {
        self.streams.values()
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn stream_count(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty() && self.groups.is_empty() && self.streams.is_empty()
    }

    // ==================== Presentation helpers ====================

    pub fn summary(&self) -> Summary {
        Summary {
            server_version: self.server_version.clone(),
            clients: self.clients.len(),
            groups: self.groups.len(),
            streams: self.streams.len(),
        }
    }

    /// Group the client is assigned to
    pub fn group_of(&self, client_id: &ClientId) -> Option<&Group> {
        let client = self.clients.get(client_id)?;
        self.groups.get(&client.group_id)
    }

    /// Member clients of a group, in member order
    pub fn members_of(&self, group_id: &GroupId) -> Vec<&Client> {
        self.groups
            .get(group_id)
            .map(|group| {
                group
                    .members
                    .iter()
                    .filter_map(|id| self.clients.get(id))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Current selection of a group: mute if muted, otherwise its stream
    pub fn selection_of(&self, group_id: &GroupId) -> Option<GroupSelection> {
        let group = self.groups.get(group_id)?;
        if group.muted {
            return Some(GroupSelection::Mute);
        }
        group.stream_id.clone().map(GroupSelection::Stream)
    }

    /// Every stream as a selector entry (`"name : status"`), then mute
    pub fn stream_choices(&self) -> Vec<SelectionChoice> {
        self.streams
            .values()
            .map(|stream| SelectionChoice {
                selection: GroupSelection::Stream(stream.id.clone()),
                label: stream.label(),
            })
            .chain(std::iter::once(SelectionChoice {
                selection: GroupSelection::Mute,
                label: "Mute".to_string(),
            }))
            .collect()
    }

    pub fn client_display_name<'a>(&'a self, id: &'a ClientId) -> &'a str {
        self.clients
            .get(id)
            .map(Client::display_name)
            .unwrap_or(id.as_str())
    }

    pub fn group_display_name<'a>(&'a self, id: &'a GroupId) -> &'a str {
        self.groups
            .get(id)
            .map(Group::display_name)
            .unwrap_or(id.as_str())
    }

    pub fn stream_display_name<'a>(&'a self, id: &'a StreamId) -> &'a str {
        self.streams
            .get(id)
            .map(Stream::display_name)
            .unwrap_or(id.as_str())
    }

    // ==================== Invariants ====================

    /// Every invariant violation in this snapshot; empty when consistent
    pub fn check_consistency(&self) -> Vec<Inconsistency> {
        let mut problems = Vec::new();
        let mut seen: HashSet<&ClientId> = HashSet::new();

        for group in self.groups.values() {
            for member in &group.members {
                if !self.clients.contains_key(member) {
                    problems.push(Inconsistency::UnknownMember {
                        group: group.id.clone(),
                        client: member.clone(),
                    });
                } else if !seen.insert(member) {
                    problems.push(Inconsistency::SharedMember {
                        client: member.clone(),
                    });
                }
            }

            if let Some(stream) = &group.stream_id {
                if !self.streams.contains_key(stream) {
                    problems.push(Inconsistency::DanglingStream {
                        group: group.id.clone(),
                        stream: stream.clone(),
                    });
                }
            }
        }

        for client in self.clients.values() {
            match self.groups.get(&client.group_id) {
                None => problems.push(Inconsistency::DanglingGroup {
                    client: client.id.clone(),
                    group: client.group_id.clone(),
                }),
                Some(group) if !group.contains(&client.id) => {
                    problems.push(Inconsistency::NotAMember {
                        client: client.id.clone(),
                        group: client.group_id.clone(),
                    })
                }
                Some(_) => {}
            }
        }

        problems
    }
}
