//! # Snapcast Bridge - session bridge for Snapcast control pages
//!
//! Keeps a live, consistent view of a snapserver's clients, groups and
//! streams, and turns typed form submissions into acknowledged control
//! commands:
//!
//! ```rust,no_run
//! use snapcast_bridge::{ClientId, Intent, SessionConfig, SnapcastBridge};
//!
//! fn main() -> Result<(), snapcast_bridge::BridgeError> {
//!     snapcast_bridge::logging::init_logging_from_env().ok();
//!
//!     let bridge = SnapcastBridge::connect(SessionConfig::from_env().map_err(
//!         snapcast_bridge::BridgeError::Startup,
//!     )?)?;
//!
//!     // Reads never touch the network
//!     for client in bridge.current_snapshot().clients() {
//!         println!("{}: {}%", client.display_name(), client.volume);
//!     }
//!
//!     // Writes block until the server acknowledged them
//!     bridge.set_client_volume(&ClientId::new("00:21:6a:7d:74:fc"), 40)?;
//!
//!     // Form rows become intents; each row succeeds or fails on its own
//!     let results = bridge.submit(&[
//!         Intent::selection_from_form("4dcc4e3b", "0")?,
//!         Intent::reassign_from_form("00:21:6a:7d:74:fc", "4dcc4e3b")?,
//!     ]);
//!     for result in results {
//!         if let Err(e) = result {
//!             eprintln!("{:?}: {}", e.kind(), e);
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! snapcast-bridge (facade + command dispatcher)
//!     ↓
//! snapcast-session (background connection, request correlation, reconnect)
//!     ↓
//! snapcast-state (single-writer cache, immutable snapshots)
//!     ↓
//! snapcast-api (JSON-RPC frames, operations, notifications)
//! ```

// Main exports
pub use bridge::SnapcastBridge;
pub use dispatcher::{CommandDispatcher, CommandSink};
pub use error::{BridgeError, EntityKind, ErrorKind, Result};
pub use intent::{Confirmation, Intent};

// Re-export commonly used types from the lower layers
pub use snapcast_session::{ConnectionState, ReconnectPolicy, SessionConfig, SessionManager};
pub use snapcast_state::{
    logging, Client, ClientId, Group, GroupId, GroupSelection, SelectionChoice, Snapshot, Stream,
    StreamId, StreamStatus, Summary,
};

// Internal modules
mod bridge;
mod dispatcher;
mod error;
mod intent;
