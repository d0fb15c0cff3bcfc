//! State caching functionality

mod snapshot;
mod state_cache;

pub use snapshot::{Inconsistency, SelectionChoice, Snapshot, Summary};
pub use state_cache::StateCache;

use parking_lot::RwLock;
use std::sync::Arc;

/// Shared read side of a [`StateCache`]
///
/// Readers on any thread get the most recently published snapshot. A
/// loaded snapshot never changes; later updates publish a new one.
#[derive(Debug, Clone, Default)]
pub struct SnapshotHandle {
    inner: Arc<RwLock<Arc<Snapshot>>>,
}

impl SnapshotHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot
    pub fn load(&self) -> Arc<Snapshot> {
        Arc::clone(&self.inner.read())
    }

    pub(crate) fn store(&self, snapshot: Snapshot) {
        *self.inner.write() = Arc::new(snapshot);
    }
}
