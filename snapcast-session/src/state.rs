//! Connection status shared between the worker and its callers

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// Where the worker is in its connection lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// First connection attempt in progress
    Connecting,
    /// Connected and holding a full state for `session`
    Connected { session: u64 },
    /// Waiting to retry after `attempt` consecutive failures
    Reconnecting { attempt: u32 },
    /// The reconnect policy ran out of attempts
    GaveUp,
    /// The worker has stopped
    Closed,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected { .. })
    }

    /// No further transitions will happen
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConnectionState::GaveUp | ConnectionState::Closed)
    }
}

#[derive(Debug)]
pub(crate) struct Shared {
    state: Mutex<ConnectionState>,
    changed: Condvar,
}

impl Shared {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ConnectionState::Connecting),
            changed: Condvar::new(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    pub fn set_state(&self, state: ConnectionState) {
        let mut current = self.state.lock();
        if current.is_terminal() && !state.is_terminal() {
            return;
        }
        *current = state;
        self.changed.notify_all();
    }

    /// Block until connected, a terminal state, or `timeout`
    pub fn wait_until_settled(&self, timeout: Duration) -> ConnectionState {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        while !state.is_connected() && !state.is_terminal() {
            if self.changed.wait_until(&mut state, deadline).timed_out() {
                break;
            }
        }
        *state
    }
}
