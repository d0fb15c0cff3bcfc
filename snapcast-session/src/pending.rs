//! In-flight requests awaiting a response
//!
//! Owned by the worker. Every entry carries its own deadline; the worker
//! expires overdue entries so a late response finds nothing to complete.

use std::collections::HashMap;
use std::sync::mpsc::SyncSender;
use std::time::Duration;

use snapcast_api::{Operation, OperationResult, RequestId};
use tokio::time::Instant;

use crate::error::{Result, SessionError};

/// Where a completed request's outcome goes
pub(crate) type Reply = SyncSender<Result<OperationResult>>;

#[derive(Debug)]
pub(crate) struct PendingEntry {
    pub operation: Operation,
    pub deadline: Instant,
    pub timeout: Duration,
    /// `None` for requests the worker issues on its own behalf
    reply: Option<Reply>,
}

impl PendingEntry {
    pub fn new(operation: Operation, timeout: Duration, deadline: Instant, reply: Reply) -> Self {
        Self {
            operation,
            deadline,
            timeout,
            reply: Some(reply),
        }
    }

    pub fn internal(operation: Operation, timeout: Duration, deadline: Instant) -> Self {
        Self {
            operation,
            deadline,
            timeout,
            reply: None,
        }
    }

    pub fn is_internal(&self) -> bool {
        self.reply.is_none()
    }

    /// Hand the outcome to the caller; a caller that stopped waiting is fine
    pub fn complete(self, result: Result<OperationResult>) {
        if let Some(reply) = self.reply {
            if reply.try_send(result).is_err() {
                tracing::debug!(method = self.operation.method(), "caller no longer waiting");
            }
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct PendingTable {
    entries: HashMap<RequestId, PendingEntry>,
}

impl PendingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: RequestId, entry: PendingEntry) {
        if let Some(previous) = self.entries.insert(id, entry) {
            tracing::warn!(id, "request id reused while still pending");
            previous.complete(Err(SessionError::Protocol(format!(
                "request id {id} reused"
            ))));
        }
    }

    pub fn take(&mut self, id: RequestId) -> Option<PendingEntry> {
        self.entries.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn has_internal(&self) -> bool {
        self.entries.values().any(PendingEntry::is_internal)
    }

    /// Earliest deadline among pending requests
    pub fn next_deadline(&self) -> Option<Instant> {
        self.entries.values().map(|entry| entry.deadline).min()
    }

    /// Resolve every entry whose deadline is at or before `now` with
    /// `Timeout`; returns how many expired
    pub fn expire(&mut self, now: Instant) -> usize {
        let overdue: Vec<RequestId> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.deadline <= now)
            .map(|(id, _)| *id)
            .collect();

        for id in &overdue {
            if let Some(entry) = self.entries.remove(id) {
                tracing::warn!(
                    id,
                    method = entry.operation.method(),
                    timeout_ms = entry.timeout.as_millis() as u64,
                    "request timed out"
                );
                let timeout = entry.timeout;
                entry.complete(Err(SessionError::Timeout(timeout)));
            }
        }
        overdue.len()
    }

    /// Resolve every entry with `ConnectionLost`
    pub fn fail_all(&mut self) -> usize {
        let count = self.entries.len();
        for (_, entry) in self.entries.drain() {
            entry.complete(Err(SessionError::ConnectionLost));
        }
        count
    }
}
