//! In-process fake snapserver for integration tests
//!
//! Speaks the line-delimited JSON-RPC control protocol on a loopback port,
//! keeps a mutable status document, and lets tests delay or hold responses,
//! push notifications and drop the connection.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use serde_json::{json, Value};
use snapcast_bridge::{ReconnectPolicy, SessionConfig};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// One request the fake server received
#[derive(Debug, Clone)]
pub struct Received {
    pub id: Value,
    pub method: String,
    pub params: Value,
    pub received_at: Instant,
    pub answered_at: Option<Instant>,
}

#[derive(Debug)]
enum Control {
    Send(String),
    ReleaseHeld,
    Disconnect,
    Stop,
}

#[derive(Debug, Default)]
struct ServerState {
    status: Value,
    delays: HashMap<String, Duration>,
    held_methods: HashSet<String>,
    received: Vec<Received>,
    connections: usize,
}

pub struct FakeSnapserver {
    address: SocketAddr,
    state: Arc<Mutex<ServerState>>,
    control: mpsc::UnboundedSender<Control>,
}

impl FakeSnapserver {
    pub fn start(status: Value) -> Self {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();
        let address = listener.local_addr().unwrap();

        let state = Arc::new(Mutex::new(ServerState {
            status,
            ..Default::default()
        }));
        let (control, control_rx) = mpsc::unbounded_channel();

        let server_state = Arc::clone(&state);
        thread::spawn(move || {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            rt.block_on(async move {
                let listener = TcpListener::from_std(listener).unwrap();
                serve(listener, server_state, control_rx).await;
            });
        });

        Self {
            address,
            state,
            control,
        }
    }

    /// Session configuration pointed at this server with test-sized timeouts
    pub fn config(&self) -> SessionConfig {
        SessionConfig::for_server("127.0.0.1", self.address.port())
            .with_request_timeout(Duration::from_secs(2))
            .with_connect_timeout(Duration::from_secs(5))
            .with_dial_timeout(Duration::from_secs(1))
            .with_reconnect(ReconnectPolicy::fixed(Duration::from_millis(20)))
    }

    /// Wait this long before answering `method`
    pub fn set_delay(&self, method: &str, delay: Duration) {
        self.state
            .lock()
            .unwrap()
            .delays
            .insert(method.to_string(), delay);
    }

    /// Keep responses to `method` until [`release_held`](Self::release_held)
    pub fn hold(&self, method: &str) {
        self.state
            .lock()
            .unwrap()
            .held_methods
            .insert(method.to_string());
    }

    pub fn release_held(&self) {
        self.state.lock().unwrap().held_methods.clear();
        let _ = self.control.send(Control::ReleaseHeld);
    }

    pub fn notify(&self, method: &str, params: Value) {
        let frame = json!({"jsonrpc": "2.0", "method": method, "params": params});
        self.send_raw(frame.to_string());
    }

    pub fn send_raw(&self, line: String) {
        let _ = self.control.send(Control::Send(line));
    }

    pub fn disconnect(&self) {
        let _ = self.control.send(Control::Disconnect);
    }

    pub fn replace_status(&self, status: Value) {
        self.state.lock().unwrap().status = status;
    }

    pub fn received(&self) -> Vec<Received> {
        self.state.lock().unwrap().received.clone()
    }

    /// Methods received so far, excluding state pulls
    pub fn mutating_methods(&self) -> Vec<String> {
        self.received()
            .into_iter()
            .filter(|r| r.method != "Server.GetStatus")
            .map(|r| r.method)
            .collect()
    }

    /// Id of the first request received for `method`
    pub fn request_id(&self, method: &str) -> Option<Value> {
        self.received()
            .into_iter()
            .find(|r| r.method == method)
            .map(|r| r.id)
    }

    pub fn connections(&self) -> usize {
        self.state.lock().unwrap().connections
    }
}

impl Drop for FakeSnapserver {
    fn drop(&mut self) {
        let _ = self.control.send(Control::Stop);
    }
}

/// Poll `condition` until it holds or `timeout` passes
pub fn wait_for(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    condition()
}

async fn serve(
    listener: TcpListener,
    state: Arc<Mutex<ServerState>>,
    mut control: mpsc::UnboundedReceiver<Control>,
) {
    loop {
        let stream = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, _)) => stream,
                Err(_) => return,
            },
            command = control.recv() => match command {
                Some(Control::Stop) | None => return,
                Some(_) => continue,
            },
        };
        state.lock().unwrap().connections += 1;

        let (read, mut write) = stream.into_split();
        let mut lines = BufReader::new(read).lines();
        let mut held: Vec<String> = Vec::new();

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Ok(Some(line)) = line else { break };
                    if line.trim().is_empty() {
                        continue;
                    }
                    let Some((index, reply, delay, hold)) = handle_request(&state, &line) else {
                        continue;
                    };
                    if hold {
                        held.push(reply);
                        continue;
                    }
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    if write_line(&mut write, &reply).await.is_err() {
                        break;
                    }
                    state.lock().unwrap().received[index].answered_at = Some(Instant::now());
                }
                command = control.recv() => match command {
                    Some(Control::Send(line)) => {
                        if write_line(&mut write, &line).await.is_err() {
                            break;
                        }
                    }
                    Some(Control::ReleaseHeld) => {
                        for reply in held.drain(..) {
                            let _ = write_line(&mut write, &reply).await;
                        }
                    }
                    Some(Control::Disconnect) => break,
                    Some(Control::Stop) | None => return,
                },
            }
        }
    }
}

async fn write_line(
    write: &mut tokio::net::tcp::OwnedWriteHalf,
    line: &str,
) -> std::io::Result<()> {
    write.write_all(format!("{line}\r\n").as_bytes()).await
}

/// Record and answer one request; returns the reply and how to deliver it
fn handle_request(
    state: &Arc<Mutex<ServerState>>,
    line: &str,
) -> Option<(usize, String, Duration, bool)> {
    let request: Value = serde_json::from_str(line).ok()?;
    let id = request.get("id")?.clone();
    let method = request.get("method")?.as_str()?.to_string();
    let params = request.get("params").cloned().unwrap_or(Value::Null);

    let mut state = state.lock().unwrap();
    state.received.push(Received {
        id: id.clone(),
        method: method.clone(),
        params: params.clone(),
        received_at: Instant::now(),
        answered_at: None,
    });
    let index = state.received.len() - 1;
    let delay = state.delays.get(&method).copied().unwrap_or_default();
    let hold = state.held_methods.contains(&method);

    let reply = match apply(&mut state.status, &method, &params) {
        Ok(result) => json!({"id": id, "jsonrpc": "2.0", "result": result}),
        Err((code, message)) => {
            json!({"id": id, "jsonrpc": "2.0", "error": {"code": code, "message": message}})
        }
    };
    Some((index, reply.to_string(), delay, hold))
}

fn apply(status: &mut Value, method: &str, params: &Value) -> Result<Value, (i64, String)> {
    let invalid = || (-32602, "Invalid params".to_string());

    match method {
        "Server.GetStatus" => Ok(json!({"server": status.clone()})),
        "Client.SetVolume" => {
            let id = params["id"].as_str().ok_or_else(invalid)?;
            let volume = params.get("volume").cloned().ok_or_else(invalid)?;
            let client = find_client(status, id).ok_or_else(invalid)?;
            client["config"]["volume"] = volume.clone();
            Ok(json!({"volume": volume}))
        }
        "Group.SetMute" => {
            let id = params["id"].as_str().ok_or_else(invalid)?;
            let mute = params["mute"].as_bool().ok_or_else(invalid)?;
            find_group(status, id).ok_or_else(invalid)?["muted"] = json!(mute);
            Ok(json!({"mute": mute}))
        }
        "Group.SetStream" => {
            let id = params["id"].as_str().ok_or_else(invalid)?;
            let stream_id = params["stream_id"].as_str().ok_or_else(invalid)?.to_string();
            find_group(status, id).ok_or_else(invalid)?["stream_id"] = json!(stream_id);
            Ok(json!({"stream_id": stream_id}))
        }
        "Group.SetClients" => {
            let id = params["id"].as_str().ok_or_else(invalid)?.to_string();
            let wanted: Vec<String> = params["clients"]
                .as_array()
                .ok_or_else(invalid)?
                .iter()
                .filter_map(|c| c.as_str().map(str::to_string))
                .collect();
            set_clients(status, &id, &wanted).ok_or_else(invalid)?;
            Ok(json!({"server": status.clone()}))
        }
        _ => Err((-32601, "Method not found".to_string())),
    }
}

fn groups_mut(status: &mut Value) -> &mut Vec<Value> {
    if !status["groups"].is_array() {
        status["groups"] = json!([]);
    }
    match status["groups"].as_array_mut() {
        Some(groups) => groups,
        None => unreachable!("groups was just made an array"),
    }
}

fn find_group<'a>(status: &'a mut Value, id: &str) -> Option<&'a mut Value> {
    groups_mut(status).iter_mut().find(|g| g["id"] == id)
}

fn find_client<'a>(status: &'a mut Value, id: &str) -> Option<&'a mut Value> {
    groups_mut(status)
        .iter_mut()
        .filter_map(|g| g["clients"].as_array_mut())
        .flatten()
        .find(|c| c["id"] == id)
}

/// Move the listed clients into `group_id` the way snapserver does, giving
/// displaced members a group of their own and dropping emptied groups
fn set_clients(status: &mut Value, group_id: &str, wanted: &[String]) -> Option<()> {
    let groups = groups_mut(status);
    groups.iter().find(|g| g["id"] == group_id)?;

    let mut pool: Vec<Value> = Vec::new();
    for group in groups.iter_mut() {
        if let Some(clients) = group["clients"].as_array_mut() {
            pool.extend(clients.drain(..));
        }
    }

    let mut next_group = 0;
    let mut displaced = Vec::new();
    for client in pool {
        let listed = client["id"]
            .as_str()
            .map_or(false, |id| wanted.iter().any(|w| w == id));
        if listed {
            let group = groups.iter_mut().find(|g| g["id"] == group_id)?;
            group["clients"].as_array_mut()?.push(client);
        } else {
            displaced.push(client);
        }
    }

    // Unlisted clients go back into an emptied group, or a new one.
    for client in displaced {
        let empty = groups.iter_mut().find(|g| {
            g["id"] != group_id && g["clients"].as_array().map_or(false, |c| c.is_empty())
        });
        match empty {
            Some(group) => group["clients"].as_array_mut()?.push(client),
            None => {
                next_group += 1;
                groups.push(json!({
                    "id": format!("{group_id}-split-{next_group}"),
                    "name": "",
                    "muted": false,
                    "stream_id": "",
                    "clients": [client],
                }));
            }
        }
    }

    groups.retain(|g| g["clients"].as_array().map_or(false, |c| !c.is_empty()));
    Some(())
}

// ============================================================================
// Status documents
// ============================================================================

pub fn client_json(id: &str, host: &str, percent: u8, muted: bool) -> Value {
    json!({
        "id": id,
        "connected": true,
        "config": {
            "name": "",
            "volume": {"muted": muted, "percent": percent},
            "latency": 0,
            "instance": 1
        },
        "host": {"name": host, "ip": "127.0.0.1", "mac": id, "os": "Linux", "arch": "x86_64"}
    })
}

pub fn stream_json(id: &str, name: &str, status: &str) -> Value {
    json!({
        "id": id,
        "status": status,
        "uri": {
            "raw": format!("pipe:///tmp/{id}?name={name}"),
            "scheme": "pipe",
            "host": "",
            "path": format!("/tmp/{id}"),
            "fragment": "",
            "query": {"name": name}
        }
    })
}

fn server_info() -> Value {
    json!({
        "host": {"name": "fake", "ip": "127.0.0.1", "mac": "", "os": "Linux", "arch": "x86_64"},
        "snapserver": {
            "name": "Snapserver",
            "version": "0.27.0",
            "protocolVersion": 1,
            "controlProtocolVersion": 1
        }
    })
}

/// Two groups, three clients, two streams; `downstairs` starts muted
pub fn default_status() -> Value {
    json!({
        "groups": [
            {
                "id": "downstairs",
                "name": "Downstairs",
                "muted": true,
                "stream_id": "radio",
                "clients": [client_json("kitchen", "kitchen-pi", 40, false)]
            },
            {
                "id": "outside",
                "name": "",
                "muted": false,
                "stream_id": "radio",
                "clients": [
                    client_json("patio", "patio-pi", 50, false),
                    client_json("garage", "garage-pi", 30, true)
                ]
            }
        ],
        "server": server_info(),
        "streams": [
            stream_json("radio", "Radio", "playing"),
            stream_json("spotify", "Spotify", "idle")
        ]
    })
}

/// A different server state, as after a server restart
pub fn replacement_status() -> Value {
    json!({
        "groups": [
            {
                "id": "attic",
                "name": "Attic",
                "muted": false,
                "stream_id": "spotify",
                "clients": [client_json("attic", "attic-pi", 70, false)]
            }
        ],
        "server": server_info(),
        "streams": [stream_json("spotify", "Spotify", "playing")]
    })
}
