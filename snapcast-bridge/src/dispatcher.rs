//! Command dispatcher
//!
//! Validates each intent against the current snapshot and turns it into the
//! wire operations that carry it out, waiting for every acknowledgement
//! before returning.

use std::sync::Arc;

use snapcast_api::{ClientVolume, Operation, OperationResult, MAX_VOLUME};
use snapcast_session::{SessionError, SessionManager};
use snapcast_state::{ClientId, GroupId, GroupSelection, Snapshot, StreamId};

use crate::error::{BridgeError, EntityKind, Result};
use crate::intent::{Confirmation, Intent};

/// Where the dispatcher reads state and sends operations
///
/// Implemented by [`SessionManager`]; tests substitute a recording sink.
pub trait CommandSink {
    /// Current state view
    fn snapshot(&self) -> Arc<Snapshot>;

    /// Send one operation and block until it is acknowledged or fails
    fn execute(&self, operation: Operation) -> std::result::Result<OperationResult, SessionError>;
}

impl CommandSink for SessionManager {
    fn snapshot(&self) -> Arc<Snapshot> {
        SessionManager::snapshot(self)
    }

    fn execute(&self, operation: Operation) -> std::result::Result<OperationResult, SessionError> {
        self.request(operation)
    }
}

/// Translates intents into acknowledged wire operations
#[derive(Debug)]
pub struct CommandDispatcher<S> {
    sink: S,
}

impl<S: CommandSink> CommandDispatcher<S> {
    pub fn new(sink: S) -> Self {
        Self { sink }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Set a client's volume, keeping its current client-level mute
    pub fn set_client_volume(&self, client_id: &ClientId, volume: u8) -> Result<Confirmation> {
        if volume > MAX_VOLUME {
            return Err(BridgeError::InvalidArgument(format!(
                "volume must be between 0 and {MAX_VOLUME}, got {volume}"
            )));
        }

        let snapshot = self.sink.snapshot();
        let client = snapshot
            .client(client_id)
            .ok_or_else(|| BridgeError::not_found(EntityKind::Client, client_id))?;

        let operation = Operation::SetClientVolume {
            client_id: client_id.to_string(),
            volume: ClientVolume::new(volume, client.muted),
        };
        self.issue(vec![operation])
    }

    /// Mute a group, or make it play a stream
    ///
    /// Selecting a stream for a muted group unmutes it first and only
    /// switches the stream once the unmute was acknowledged. If the unmute
    /// fails the stream is left alone.
    pub fn set_group_selection(
        &self,
        group_id: &GroupId,
        selection: &GroupSelection,
    ) -> Result<Confirmation> {
        let snapshot = self.sink.snapshot();
        let group = snapshot
            .group(group_id)
            .ok_or_else(|| BridgeError::not_found(EntityKind::Group, group_id))?;

        match selection {
            GroupSelection::Mute => self.issue(vec![Operation::SetGroupMute {
                group_id: group_id.to_string(),
                mute: true,
            }]),
            GroupSelection::Stream(stream_id) => {
                if snapshot.stream(stream_id).is_none() {
                    return Err(BridgeError::not_found(EntityKind::Stream, stream_id));
                }

                let mut operations = Vec::with_capacity(2);
                if group.muted {
                    operations.push(Operation::SetGroupMute {
                        group_id: group_id.to_string(),
                        mute: false,
                    });
                }
                operations.push(set_stream(group_id, stream_id));
                self.issue(operations)
            }
        }
    }

    /// Move a client into another group
    ///
    /// The server removes the client from its previous group on its own.
    /// Asking for the group the client is already in sends nothing.
    pub fn reassign_client(&self, client_id: &ClientId, group_id: &GroupId) -> Result<Confirmation> {
        let snapshot = self.sink.snapshot();
        let client = snapshot
            .client(client_id)
            .ok_or_else(|| BridgeError::not_found(EntityKind::Client, client_id))?;
        let group = snapshot
            .group(group_id)
            .ok_or_else(|| BridgeError::not_found(EntityKind::Group, group_id))?;

        if &client.group_id == group_id {
            tracing::debug!(%client_id, %group_id, "client already in group");
            return Ok(Confirmation::nothing_sent());
        }

        let clients = group
            .members
            .iter()
            .chain(std::iter::once(client_id))
            .map(ToString::to_string)
            .collect();

        self.issue(vec![Operation::SetGroupClients {
            group_id: group_id.to_string(),
            clients,
        }])
    }

    /// Carry out one intent
    pub fn apply(&self, intent: &Intent) -> Result<Confirmation> {
        match intent {
            Intent::SetClientVolume { client_id, volume } => {
                self.set_client_volume(client_id, *volume)
            }
            Intent::SetGroupSelection {
                group_id,
                selection,
            } => self.set_group_selection(group_id, selection),
            Intent::ReassignClient {
                client_id,
                group_id,
            } => self.reassign_client(client_id, group_id),
        }
    }

    /// Carry out intents one after another; a failed row does not stop the
    /// rest
    pub fn submit(&self, intents: &[Intent]) -> Vec<Result<Confirmation>> {
        intents.iter().map(|intent| self.apply(intent)).collect()
    }

    pub fn set_client_volumes(&self, rows: &[(ClientId, u8)]) -> Vec<Result<Confirmation>> {
        rows.iter()
            .map(|(client_id, volume)| self.set_client_volume(client_id, *volume))
            .collect()
    }

    pub fn set_group_selections(
        &self,
        rows: &[(GroupId, GroupSelection)],
    ) -> Vec<Result<Confirmation>> {
        rows.iter()
            .map(|(group_id, selection)| self.set_group_selection(group_id, selection))
            .collect()
    }

    pub fn reassign_clients(&self, rows: &[(ClientId, GroupId)]) -> Vec<Result<Confirmation>> {
        rows.iter()
            .map(|(client_id, group_id)| self.reassign_client(client_id, group_id))
            .collect()
    }

    /// Send operations strictly in order, each only after the previous one
    /// was acknowledged
    fn issue(&self, operations: Vec<Operation>) -> Result<Confirmation> {
        let mut issued = Vec::with_capacity(operations.len());
        for operation in operations {
            tracing::debug!(method = operation.method(), "dispatching");
            if let Err(e) = self.sink.execute(operation.clone()) {
                tracing::warn!(method = operation.method(), error = %e, "operation failed");
                return Err(e.into());
            }
            issued.push(operation);
        }
        Ok(Confirmation::of(issued))
    }
}

fn set_stream(group_id: &GroupId, stream_id: &StreamId) -> Operation {
    Operation::SetGroupStream {
        group_id: group_id.to_string(),
        stream_id: stream_id.to_string(),
    }
}
