//! Snapcast control protocol
//!
//! Type-safe encoding and decoding for the snapserver's JSON-RPC 2.0 control
//! interface (newline-delimited JSON over TCP, port 1705 by default).
//!
//! ```rust
//! use snapcast_api::{encode_request, Operation};
//!
//! let op = Operation::SetGroupMute { group_id: "4dcc4e3b".to_string(), mute: true };
//! op.validate()?;
//! let line = encode_request(1, &op)?;
//! assert!(line.contains("Group.SetMute"));
//! # Ok::<(), snapcast_api::ApiError>(())
//! ```
//!
//! This crate only describes the wire contract. Connection handling lives in
//! `snapcast-session`.

pub mod error;
pub mod events;
pub mod operation;
pub mod payload;
pub mod rpc;

pub use error::{ApiError, Result};
pub use events::ServerEvent;
pub use operation::{Operation, OperationResult, MAX_VOLUME};
pub use payload::{
    ClientConfig, ClientPayload, ClientVolume, GroupPayload, HostInfo, ServerStatus,
    StatusEnvelope, StreamPayload,
};
pub use rpc::{decode_frames, encode_request, Frame, Notification, RequestId, Response, RpcError};

/// Default snapserver control port
pub const DEFAULT_CONTROL_PORT: u16 = 1705;
