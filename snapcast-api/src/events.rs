//! Server notifications
//!
//! The snapserver pushes a notification whenever state changes outside of a
//! request we issued. [`ServerEvent::from_notification`] turns the raw
//! `method`/`params` pair into a typed event; methods the bridge does not
//! track decode to [`ServerEvent::Unknown`].

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{ApiError, Result};
use crate::payload::{ClientPayload, ClientVolume, ServerStatus, StatusEnvelope, StreamPayload};
use crate::rpc::Notification;

/// Typed server notification
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    /// `Client.OnVolumeChanged`
    ClientVolumeChanged {
        client_id: String,
        volume: ClientVolume,
    },
    /// `Client.OnConnect`
    ClientConnected {
        client_id: String,
        client: ClientPayload,
    },
    /// `Client.OnDisconnect`
    ClientDisconnected {
        client_id: String,
        client: ClientPayload,
    },
    /// `Client.OnNameChanged`
    ClientNameChanged { client_id: String, name: String },
    /// `Group.OnMute`
    GroupMuteChanged { group_id: String, muted: bool },
    /// `Group.OnStreamChanged`
    GroupStreamChanged { group_id: String, stream_id: String },
    /// `Group.OnNameChanged`
    GroupNameChanged { group_id: String, name: String },
    /// `Stream.OnUpdate`
    StreamUpdated {
        stream_id: String,
        stream: StreamPayload,
    },
    /// `Server.OnUpdate`: the whole state document
    ServerUpdated(Box<ServerStatus>),
    /// Any method not listed above
    Unknown { method: String },
}

impl ServerEvent {
    /// Decode a notification frame
    pub fn from_notification(notification: &Notification) -> Result<Self> {
        let method = notification.method.as_str();
        let params = &notification.params;

        let event = match method {
            "Client.OnVolumeChanged" => {
                #[derive(Deserialize)]
                struct Params {
                    id: String,
                    volume: ClientVolume,
                }
                let p: Params = decode(method, params)?;
                ServerEvent::ClientVolumeChanged {
                    client_id: p.id,
                    volume: p.volume,
                }
            }
            "Client.OnConnect" | "Client.OnDisconnect" => {
                #[derive(Deserialize)]
                struct Params {
                    id: String,
                    client: ClientPayload,
                }
                let p: Params = decode(method, params)?;
                if method == "Client.OnConnect" {
                    ServerEvent::ClientConnected {
                        client_id: p.id,
                        client: p.client,
                    }
                } else {
                    ServerEvent::ClientDisconnected {
                        client_id: p.id,
                        client: p.client,
                    }
                }
            }
            "Client.OnNameChanged" => {
                let p: NameParams = decode(method, params)?;
                ServerEvent::ClientNameChanged {
                    client_id: p.id,
                    name: p.name,
                }
            }
            "Group.OnMute" => {
                #[derive(Deserialize)]
                struct Params {
                    id: String,
                    mute: bool,
                }
                let p: Params = decode(method, params)?;
                ServerEvent::GroupMuteChanged {
                    group_id: p.id,
                    muted: p.mute,
                }
            }
            "Group.OnStreamChanged" => {
                #[derive(Deserialize)]
                struct Params {
                    id: String,
                    stream_id: String,
                }
                let p: Params = decode(method, params)?;
                ServerEvent::GroupStreamChanged {
                    group_id: p.id,
                    stream_id: p.stream_id,
                }
            }
            "Group.OnNameChanged" => {
                let p: NameParams = decode(method, params)?;
                ServerEvent::GroupNameChanged {
                    group_id: p.id,
                    name: p.name,
                }
            }
            "Stream.OnUpdate" => {
                #[derive(Deserialize)]
                struct Params {
                    id: String,
                    stream: StreamPayload,
                }
                let p: Params = decode(method, params)?;
                ServerEvent::StreamUpdated {
                    stream_id: p.id,
                    stream: p.stream,
                }
            }
            "Server.OnUpdate" => {
                let p: StatusEnvelope = decode(method, params)?;
                ServerEvent::ServerUpdated(Box::new(p.server))
            }
            other => ServerEvent::Unknown {
                method: other.to_string(),
            },
        };

        Ok(event)
    }
}

#[derive(Deserialize)]
struct NameParams {
    id: String,
    #[serde(default)]
    name: String,
}

fn decode<T: DeserializeOwned>(method: &str, params: &Value) -> Result<T> {
    T::deserialize(params)
        .map_err(|e| ApiError::ParseError(format!("invalid params for {}: {}", method, e)))
}
