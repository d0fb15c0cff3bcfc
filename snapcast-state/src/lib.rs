//! Snapcast State Management
//!
//! An in-memory mirror of a snapserver's clients, groups and streams.
//!
//! # Architecture
//!
//! ```text
//! notifications / acks → decoder → StateEvent → StateCache → Snapshot
//!                                               (one writer)  (any reader)
//! ```
//!
//! The cache has exactly one writer. Every change publishes a new immutable
//! [`Snapshot`]; readers load it through a [`SnapshotHandle`] and never
//! observe a half-applied update.
//!
//! # Example
//!
//! ```rust
//! use snapcast_state::{ClientId, GroupId, Snapshot, StateCache, StateEvent};
//! use snapcast_state::model::{Client, Group};
//!
//! let mut group = Group::new(GroupId::new("g1"));
//! group.members.push(ClientId::new("c1"));
//! let client = Client::new(ClientId::new("c1"), GroupId::new("g1"));
//!
//! let mut cache = StateCache::new();
//! cache.begin_session(1, Snapshot::from_parts(None, vec![group], vec![client], vec![]));
//!
//! let change = cache.apply_event(StateEvent::ClientVolumeChanged {
//!     client_id: ClientId::new("c1"),
//!     volume: 30,
//!     muted: false,
//! });
//! assert!(change.is_some());
//! assert_eq!(cache.snapshot().client(&ClientId::new("c1")).unwrap().volume, 30);
//! ```

pub mod cache;
pub mod decoder;
pub mod event;
pub mod logging;
pub mod model;

pub use cache::{Inconsistency, SelectionChoice, Snapshot, SnapshotHandle, StateCache, Summary};
pub use event::StateEvent;
pub use model::{
    Client, ClientId, Group, GroupId, GroupSelection, StateChange, Stream, StreamId, StreamStatus,
};
