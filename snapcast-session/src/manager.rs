//! Sync-first Snapcast session manager
//!
//! Provides a fully synchronous API over the control connection. All async
//! work happens in a background worker thread.

use std::sync::mpsc::{sync_channel, RecvTimeoutError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use snapcast_api::{Operation, OperationResult};
use snapcast_state::{Snapshot, SnapshotHandle, StateCache};
use tokio::sync::mpsc;

use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::state::{ConnectionState, Shared};
use crate::worker::{spawn_session_worker, Command};

/// Extra time a caller waits beyond the request timeout before assuming
/// the worker is gone
const REPLY_GRACE: Duration = Duration::from_millis(250);

/// Sync handle to a background snapserver connection
///
/// Owns the worker thread. Every method is blocking and callable from any
/// thread; requests from different threads go out in the order they were
/// enqueued.
///
/// # Example
///
/// ```rust,no_run
/// use snapcast_api::Operation;
/// use snapcast_session::{SessionConfig, SessionManager};
///
/// let session = SessionManager::connect(SessionConfig::for_server("192.168.1.20", 1705))?;
/// println!("{} clients", session.snapshot().client_count());
///
/// session.request(Operation::SetGroupMute {
///     group_id: "4dcc4e3b".to_string(),
///     mute: true,
/// })?;
/// # Ok::<(), snapcast_session::SessionError>(())
/// ```
pub struct SessionManager {
    /// Send commands to background worker
    command_tx: mpsc::UnboundedSender<Command>,

    /// Published state (sync access)
    snapshot: SnapshotHandle,

    /// Connection status and readiness signalling
    shared: Arc<Shared>,

    config: SessionConfig,

    /// Background worker handle, taken on shutdown
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl SessionManager {
    /// Spawn the worker and return immediately
    ///
    /// The connection is established in the background; until then the
    /// snapshot is empty and requests fail with `ConnectionLost`.
    pub fn start(config: SessionConfig) -> Result<Self> {
        config.validate()?;

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let cache = StateCache::new();
        let snapshot = cache.handle();
        let shared = Arc::new(Shared::new());

        let worker = spawn_session_worker(config.clone(), cache, Arc::clone(&shared), command_rx)
            .map_err(SessionError::WorkerSpawn)?;

        Ok(Self {
            command_tx,
            snapshot,
            shared,
            config,
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Spawn the worker and block until the first full state is loaded
    ///
    /// Fails with `Timeout` if that takes longer than `connect_timeout`, or
    /// `ConnectionLost` if the reconnect policy gives up first. The worker
    /// is stopped on failure.
    pub fn connect(config: SessionConfig) -> Result<Self> {
        let connect_timeout = config.connect_timeout;
        let manager = Self::start(config)?;

        match manager.shared.wait_until_settled(connect_timeout) {
            ConnectionState::Connected { session } => {
                tracing::debug!(session, "session ready");
                Ok(manager)
            }
            state if state.is_terminal() => {
                manager.shutdown();
                Err(SessionError::ConnectionLost)
            }
            _ => {
                manager.shutdown();
                Err(SessionError::Timeout(connect_timeout))
            }
        }
    }

    /// Send an operation and wait for its outcome using the configured
    /// request timeout
    pub fn request(&self, operation: Operation) -> Result<OperationResult> {
        self.request_with_timeout(operation, self.config.request_timeout)
    }

    /// Send an operation and wait at most `timeout` for its outcome
    ///
    /// The worker enforces the timeout. A response arriving after it is
    /// discarded and never reaches the state.
    pub fn request_with_timeout(
        &self,
        operation: Operation,
        timeout: Duration,
    ) -> Result<OperationResult> {
        operation.validate()?;

        let (reply, completion) = sync_channel(1);
        let method = operation.method();
        self.command_tx
            .send(Command::Request {
                operation,
                timeout,
                issued: Instant::now(),
                reply,
            })
            .map_err(|_| SessionError::ConnectionLost)?;

        match completion.recv_timeout(timeout + REPLY_GRACE) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                tracing::warn!(method, "no reply from session worker");
                Err(SessionError::Timeout(timeout))
            }
            Err(RecvTimeoutError::Disconnected) => Err(SessionError::ConnectionLost),
        }
    }

    /// Most recently published state
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot.load()
    }

    /// Cloneable read handle for other threads
    pub fn snapshot_handle(&self) -> SnapshotHandle {
        self.snapshot.clone()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.shared.state()
    }

    pub fn is_connected(&self) -> bool {
        self.shared.state().is_connected()
    }

    /// Block until connected or `timeout`; `true` if connected
    pub fn wait_until_ready(&self, timeout: Duration) -> bool {
        self.shared.wait_until_settled(timeout).is_connected()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Stop the worker and wait for it to exit
    ///
    /// In-flight requests fail with `ConnectionLost`. Calling this more
    /// than once is harmless.
    pub fn shutdown(&self) {
        let Some(worker) = self.worker.lock().take() else {
            return;
        };

        let _ = self.command_tx.send(Command::Shutdown);
        if worker.thread().id() == std::thread::current().id() {
            return;
        }
        if worker.join().is_err() {
            tracing::error!("Session worker panicked");
        }
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("address", &self.config.address())
            .field("state", &self.shared.state())
            .finish()
    }
}
