//! Background worker thread owning the connection
//!
//! Spawns a thread with its own single-threaded tokio runtime. The worker is
//! the only code that touches the socket, the pending table and the state
//! cache; the sync [`SessionManager`](crate::SessionManager) talks to it
//! through a command queue.

use std::future::Future;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use snapcast_api::{
    decode_frames, encode_request, Frame, Notification, Operation, OperationResult, RequestId,
    Response, ServerEvent, ServerStatus,
};
use snapcast_state::{decoder, StateCache, StateEvent};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::Instant;

use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::pending::{PendingEntry, PendingTable, Reply};
use crate::state::{ConnectionState, Shared};
use crate::transport::Connection;

/// Commands sent from the sync SessionManager to the background worker
#[derive(Debug)]
pub(crate) enum Command {
    /// Send an operation and report its outcome on `reply`
    Request {
        operation: Operation,
        timeout: Duration,
        issued: std::time::Instant,
        reply: Reply,
    },
    /// Fail everything in flight and stop
    Shutdown,
}

/// Why the connected phase ended
enum Disconnect {
    Lost,
    Shutdown,
}

/// Spawns the background session worker thread
pub(crate) fn spawn_session_worker(
    config: SessionConfig,
    cache: StateCache,
    shared: Arc<Shared>,
    commands: UnboundedReceiver<Command>,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("snapcast-session".to_string())
        .spawn(move || {
            let rt = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    tracing::error!("Failed to create tokio runtime for session worker: {}", e);
                    shared.set_state(ConnectionState::Closed);
                    return;
                }
            };

            let worker = Worker {
                config,
                cache,
                shared,
                pending: PendingTable::new(),
                next_id: 0,
                session: 0,
            };
            rt.block_on(worker.run(commands));
        })
}

struct Worker {
    config: SessionConfig,
    cache: StateCache,
    shared: Arc<Shared>,
    pending: PendingTable,
    next_id: RequestId,
    session: u64,
}

impl Worker {
    async fn run(mut self, mut commands: UnboundedReceiver<Command>) {
        tracing::info!(address = %self.config.address(), "Session worker started");
        let mut failures: u32 = 0;
        let mut first_attempt = true;

        loop {
            if !first_attempt {
                let delay = self.config.reconnect.delay_after_failures(failures);
                tracing::debug!(delay_ms = delay.as_millis() as u64, failures, "waiting before reconnect");
                if run_offline(tokio::time::sleep(delay), &mut commands)
                    .await
                    .is_none()
                {
                    break;
                }
            }
            first_attempt = false;

            let request_id = self.allocate_id();
            let attempt = establish(self.config.clone(), request_id);
            let (mut connection, status) = match run_offline(attempt, &mut commands).await {
                None => break,
                Some(Ok(established)) => established,
                Some(Err(e)) => {
                    failures = failures.saturating_add(1);
                    tracing::warn!(
                        address = %self.config.address(),
                        failures,
                        error = %e,
                        "Failed to connect to snapserver"
                    );
                    if !self.config.reconnect.allows_attempt(failures) {
                        tracing::error!(failures, "Giving up on snapserver connection");
                        self.shared.set_state(ConnectionState::GaveUp);
                        refuse_remaining(&mut commands);
                        return;
                    }
                    self.shared
                        .set_state(ConnectionState::Reconnecting { attempt: failures });
                    continue;
                }
            };

            failures = 0;
            self.session += 1;
            self.cache
                .begin_session(self.session, decoder::snapshot_from_status(&status));
            tracing::info!(
                peer = %connection.peer(),
                session = self.session,
                version = status.version().unwrap_or("unknown"),
                "Connected to snapserver"
            );
            self.shared.set_state(ConnectionState::Connected {
                session: self.session,
            });

            let reason = self.run_connected(&mut connection, &mut commands).await;

            let failed = self.pending.fail_all();
            self.cache.clear();
            match reason {
                Disconnect::Shutdown => break,
                Disconnect::Lost => {
                    tracing::warn!(session = self.session, failed, "Connection to snapserver lost");
                    self.shared
                        .set_state(ConnectionState::Reconnecting { attempt: 0 });
                }
            }
        }

        self.pending.fail_all();
        self.cache.clear();
        self.shared.set_state(ConnectionState::Closed);
        tracing::info!("Session worker stopped");
    }

    /// Main loop while a connection is up
    async fn run_connected(
        &mut self,
        connection: &mut Connection,
        commands: &mut UnboundedReceiver<Command>,
    ) -> Disconnect {
        loop {
            let deadline = self.pending.next_deadline();

            let outcome = tokio::select! {
                line = connection.next_line() => match line {
                    Ok(Some(line)) => self.handle_line(&line, connection).await,
                    Ok(None) => {
                        tracing::info!("Snapserver closed the connection");
                        Err(SessionError::ConnectionLost)
                    }
                    Err(e) => Err(e),
                },

                command = commands.recv() => match command {
                    Some(Command::Request { operation, timeout, issued, reply }) => {
                        self.send_request(connection, operation, timeout, issued, reply).await
                    }
                    Some(Command::Shutdown) | None => {
                        tracing::info!("Session worker received shutdown command");
                        return Disconnect::Shutdown;
                    }
                },

                _ = sleep_until_deadline(deadline) => {
                    self.pending.expire(Instant::now());
                    Ok(())
                }
            };

            if outcome.is_err() {
                return Disconnect::Lost;
            }
        }
    }

    async fn send_request(
        &mut self,
        connection: &mut Connection,
        operation: Operation,
        timeout: Duration,
        issued: std::time::Instant,
        reply: Reply,
    ) -> Result<()> {
        let deadline = Instant::from_std(issued + timeout);
        if deadline <= Instant::now() {
            tracing::debug!(method = operation.method(), "request expired in queue");
            let _ = reply.try_send(Err(SessionError::Timeout(timeout)));
            return Ok(());
        }

        let id = self.allocate_id();
        let line = match encode_request(id, &operation) {
            Ok(line) => line,
            Err(e) => {
                let _ = reply.try_send(Err(e.into()));
                return Ok(());
            }
        };

        tracing::debug!(id, method = operation.method(), "sending request");
        self.pending
            .insert(id, PendingEntry::new(operation, timeout, deadline, reply));
        connection.send_line(&line).await
    }

    /// Ask for the full state on the worker's own behalf
    async fn resync(&mut self, connection: &mut Connection) -> Result<()> {
        if self.pending.has_internal() {
            return Ok(());
        }

        let id = self.allocate_id();
        let line = encode_request(id, &Operation::GetStatus)?;
        let timeout = self.config.request_timeout;
        tracing::debug!(id, "requesting full state");
        self.pending.insert(
            id,
            PendingEntry::internal(Operation::GetStatus, timeout, Instant::now() + timeout),
        );
        connection.send_line(&line).await
    }

    async fn handle_line(&mut self, line: &str, connection: &mut Connection) -> Result<()> {
        let frames = match decode_frames(line) {
            Ok(frames) => frames,
            Err(e) => {
                tracing::warn!(error = %e, "Discarding malformed frame");
                return Ok(());
            }
        };

        for frame in frames {
            match frame {
                Frame::Response(response) => self.handle_response(response),
                Frame::Notification(notification) => {
                    self.handle_notification(notification, connection).await?
                }
                Frame::Malformed { id, reason } => self.handle_malformed(id, reason),
            }
        }
        Ok(())
    }

    /// Fail only the request a broken frame answers, if it can be told
    fn handle_malformed(&mut self, id: Option<RequestId>, reason: String) {
        tracing::warn!(?id, %reason, "Discarding malformed frame");
        if let Some(entry) = id.and_then(|id| self.pending.take(id)) {
            entry.complete(Err(SessionError::Protocol(reason)));
        }
    }

    fn handle_response(&mut self, response: Response) {
        let Some(entry) = self.pending.take(response.id) else {
            tracing::debug!(id = response.id, "discarding response with no pending request");
            return;
        };

        let result = match response.outcome {
            Ok(value) => entry
                .operation
                .parse_result(value)
                .map_err(SessionError::from),
            Err(error) => {
                tracing::warn!(
                    id = response.id,
                    method = entry.operation.method(),
                    code = error.code,
                    message = %error.message,
                    "Snapserver rejected request"
                );
                Err(SessionError::Protocol(format!(
                    "{} (code {})",
                    error.message, error.code
                )))
            }
        };

        if let Ok(outcome) = &result {
            tracing::debug!(id = response.id, method = entry.operation.method(), "request acknowledged");
            self.apply_ack(&entry.operation, outcome);
        }
        entry.complete(result);
    }

    fn apply_ack(&mut self, operation: &Operation, outcome: &OperationResult) {
        for event in decoder::decode_ack(operation, outcome) {
            self.apply(event);
        }
    }

    fn apply(&mut self, event: StateEvent) {
        if let Some(change) = self.cache.apply_event(event) {
            tracing::debug!(?change, "state changed");
        }
    }

    async fn handle_notification(
        &mut self,
        notification: Notification,
        connection: &mut Connection,
    ) -> Result<()> {
        let event = match ServerEvent::from_notification(&notification) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(method = %notification.method, error = %e, "Discarding undecodable notification");
                return Ok(());
            }
        };
        tracing::debug!(method = %notification.method, "notification received");

        if decoder::needs_resync(&event, &self.cache.snapshot()) {
            return self.resync(connection).await;
        }

        for state_event in decoder::decode_event(event) {
            self.apply(state_event);
        }
        Ok(())
    }

    fn allocate_id(&mut self) -> RequestId {
        self.next_id = self.next_id.wrapping_add(1);
        self.next_id
    }
}

/// Open a connection and pull the full state over it
async fn establish(config: SessionConfig, request_id: RequestId) -> Result<(Connection, ServerStatus)> {
    let mut connection = Connection::open(&config.address(), config.dial_timeout).await?;
    connection
        .send_line(&encode_request(request_id, &Operation::GetStatus)?)
        .await?;

    let status = tokio::time::timeout(
        config.request_timeout,
        await_status(&mut connection, request_id),
    )
    .await
    .map_err(|_| SessionError::Timeout(config.request_timeout))??;

    Ok((connection, status))
}

/// Read until the response to `request_id` arrives
///
/// Notifications before it are dropped; the full state supersedes them.
async fn await_status(connection: &mut Connection, request_id: RequestId) -> Result<ServerStatus> {
    loop {
        let Some(line) = connection.next_line().await? else {
            return Err(SessionError::ConnectionLost);
        };

        let frames = match decode_frames(&line) {
            Ok(frames) => frames,
            Err(e) => {
                tracing::warn!(error = %e, "Discarding malformed frame during handshake");
                continue;
            }
        };

        for frame in frames {
            match frame {
                Frame::Response(response) if response.id == request_id => {
                    let value = response.outcome.map_err(|error| {
                        SessionError::Protocol(format!("{} (code {})", error.message, error.code))
                    })?;
                    return match Operation::GetStatus.parse_result(value)? {
                        OperationResult::Status(status) => Ok(*status),
                        other => Err(SessionError::Protocol(format!(
                            "unexpected status result: {other:?}"
                        ))),
                    };
                }
                Frame::Response(response) => {
                    tracing::debug!(id = response.id, "ignoring stray response during handshake")
                }
                Frame::Notification(notification) => {
                    tracing::debug!(method = %notification.method, "ignoring notification during handshake")
                }
                Frame::Malformed { id: Some(id), reason } if id == request_id => {
                    return Err(SessionError::Protocol(reason));
                }
                Frame::Malformed { id, reason } => {
                    tracing::warn!(?id, %reason, "Discarding malformed frame during handshake")
                }
            }
        }
    }
}

/// Drive `future` while no connection is up, refusing requests
///
/// Returns `None` if shutdown was requested first.
async fn run_offline<F: Future>(
    future: F,
    commands: &mut UnboundedReceiver<Command>,
) -> Option<F::Output> {
    tokio::pin!(future);
    loop {
        tokio::select! {
            output = &mut future => return Some(output),
            command = commands.recv() => match command {
                Some(Command::Request { operation, reply, .. }) => {
                    tracing::debug!(method = operation.method(), "refusing request while disconnected");
                    let _ = reply.try_send(Err(SessionError::ConnectionLost));
                }
                Some(Command::Shutdown) | None => return None,
            },
        }
    }
}

/// Answer everything already queued once the worker gives up
fn refuse_remaining(commands: &mut UnboundedReceiver<Command>) {
    commands.close();
    while let Ok(command) = commands.try_recv() {
        if let Command::Request { reply, .. } = command {
            let _ = reply.try_send(Err(SessionError::ConnectionLost));
        }
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
