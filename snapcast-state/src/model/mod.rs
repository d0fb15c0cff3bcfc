//! Model types for snapcast-state

mod client;
mod group;
mod id_types;
mod selection;
mod state_change;
mod stream;
mod stream_status;

pub use client::Client;
pub use group::Group;
pub use id_types::{ClientId, GroupId, StreamId};
pub use selection::GroupSelection;
pub use state_change::StateChange;
pub use stream::Stream;
pub use stream_status::StreamStatus;
