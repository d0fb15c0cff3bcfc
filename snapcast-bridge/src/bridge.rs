//! SnapcastBridge - Main entry point
//!
//! Owns the session and exposes state reads and typed mutations to web
//! handlers.

use std::sync::Arc;
use std::time::Duration;

use snapcast_session::{ConnectionState, SessionConfig, SessionManager};
use snapcast_state::{ClientId, GroupId, GroupSelection, Snapshot, SnapshotHandle, Summary};

use crate::dispatcher::CommandDispatcher;
use crate::error::{BridgeError, Result};
use crate::intent::{Confirmation, Intent};

/// Main entry point between request handlers and the snapserver
///
/// SnapcastBridge is fully synchronous and can be shared between handler
/// threads. Dropping it stops the background connection.
///
/// # Example
///
/// ```rust,no_run
/// use snapcast_bridge::{GroupId, GroupSelection, SessionConfig, SnapcastBridge, StreamId};
///
/// fn main() -> Result<(), snapcast_bridge::BridgeError> {
///     let bridge = SnapcastBridge::connect(SessionConfig::for_server("192.168.1.20", 1705))?;
///
///     let summary = bridge.current_snapshot().summary();
///     println!("{} clients in {} groups", summary.clients, summary.groups);
///
///     bridge.set_group_selection(
///         &GroupId::new("4dcc4e3b"),
///         &GroupSelection::Stream(StreamId::new("Spotify")),
///     )?;
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct SnapcastBridge {
    dispatcher: CommandDispatcher<SessionManager>,
}

impl SnapcastBridge {
    /// Connect and wait for the first full state (up to `connect_timeout`)
    pub fn connect(config: SessionConfig) -> Result<Self> {
        let session = SessionManager::connect(config)?;
        tracing::info!(
            clients = session.snapshot().client_count(),
            "Snapcast bridge ready"
        );
        Ok(Self::from_session(session))
    }

    /// Start connecting in the background and return immediately
    ///
    /// Until the first state arrives the snapshot is empty and mutations
    /// fail with `NotFound` or `ConnectionLost`.
    pub fn start(config: SessionConfig) -> Result<Self> {
        let session = SessionManager::start(config)?;
        Ok(Self::from_session(session))
    }

    /// [`connect`](Self::connect) with configuration from `SNAPCAST_*`
    /// environment variables
    pub fn from_env() -> Result<Self> {
        let config = SessionConfig::from_env().map_err(BridgeError::Startup)?;
        Self::connect(config)
    }

    pub fn from_session(session: SessionManager) -> Self {
        Self {
            dispatcher: CommandDispatcher::new(session),
        }
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Latest consistent state; never blocks on the network
    pub fn current_snapshot(&self) -> Arc<Snapshot> {
        self.session().snapshot()
    }

    pub fn snapshot_handle(&self) -> SnapshotHandle {
        self.session().snapshot_handle()
    }

    /// Server version and entity counts
    pub fn summary(&self) -> Summary {
        self.current_snapshot().summary()
    }

    pub fn is_connected(&self) -> bool {
        self.session().is_connected()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.session().connection_state()
    }

    /// Block until connected or `timeout`; `true` if connected
    pub fn wait_until_ready(&self, timeout: Duration) -> bool {
        self.session().wait_until_ready(timeout)
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    pub fn set_client_volume(&self, client_id: &ClientId, volume: u8) -> Result<Confirmation> {
        self.dispatcher.set_client_volume(client_id, volume)
    }

    pub fn set_group_selection(
        &self,
        group_id: &GroupId,
        selection: &GroupSelection,
    ) -> Result<Confirmation> {
        self.dispatcher.set_group_selection(group_id, selection)
    }

    pub fn reassign_client(&self, client_id: &ClientId, group_id: &GroupId) -> Result<Confirmation> {
        self.dispatcher.reassign_client(client_id, group_id)
    }

    /// Apply intents in order; one result per intent
    pub fn submit(&self, intents: &[Intent]) -> Vec<Result<Confirmation>> {
        self.dispatcher.submit(intents)
    }

    /// Volumes page: one row per client
    pub fn set_client_volumes(&self, rows: &[(ClientId, u8)]) -> Vec<Result<Confirmation>> {
        self.dispatcher.set_client_volumes(rows)
    }

    /// Streams page: one row per group
    pub fn set_group_selections(
        &self,
        rows: &[(GroupId, GroupSelection)],
    ) -> Vec<Result<Confirmation>> {
        self.dispatcher.set_group_selections(rows)
    }

    /// Zones page: one row per client
    pub fn reassign_clients(&self, rows: &[(ClientId, GroupId)]) -> Vec<Result<Confirmation>> {
        self.dispatcher.reassign_clients(rows)
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Underlying session for advanced usage
    pub fn session(&self) -> &SessionManager {
        self.dispatcher.sink()
    }

    /// Stop the background connection and clear the snapshot
    pub fn shutdown(&self) {
        self.session().shutdown();
    }
}
