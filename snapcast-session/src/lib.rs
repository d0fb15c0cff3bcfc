//! Snapcast Session
//!
//! Keeps one control connection to a snapserver alive and exposes it
//! through a blocking API.
//!
//! # Architecture
//!
//! ```text
//! caller threads ──request──▶ command queue ──▶ worker thread (tokio, current-thread)
//!      ▲                                          │  socket I/O, pending table, state cache
//!      └──── per-request reply ◀──────────────────┘
//! ```
//!
//! The worker correlates responses to requests by id, applies notifications
//! and acknowledgements to the [`StateCache`](snapcast_state::StateCache),
//! expires requests that outlive their timeout, and reconnects with capped,
//! jittered backoff when the connection drops. Every reconnect starts a new
//! session with a fresh full state; in-flight requests fail with
//! [`SessionError::ConnectionLost`].

mod config;
mod error;
mod manager;
mod pending;
mod state;
mod transport;
mod worker;

pub use config::{ReconnectPolicy, SessionConfig, HOST_ENV, PORT_ENV, TIMEOUT_ENV};
pub use error::{Result, SessionError};
pub use manager::SessionManager;
pub use state::ConnectionState;

// Re-export the types callers need to build requests and read state
pub use snapcast_api::{Operation, OperationResult};
pub use snapcast_state::{Snapshot, SnapshotHandle};
