//! Queued task bookkeeping types.

use futures::future::BoxFuture;
use std::fmt;
use std::time::Instant;
use thiserror::Error;

/// Identity used to apportion fair access to the shared concurrency budget.
///
/// Owners are typically caller sessions: all tasks submitted by one caller
/// share an owner id, and the scheduler favors owners with fewer tasks
/// currently executing.
#[derive(Clone, Hash, Eq, PartialEq)]
pub struct OwnerId(String);

impl OwnerId {
    /// Creates a new owner id with the given string value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the string value of this owner id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OwnerId({})", self.0)
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for OwnerId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OwnerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Errors the queue itself can produce.
///
/// Task errors are never wrapped: work submitted to the queue returns its
/// own output type unchanged, so a caller can always tell "too slow"
/// (queue-generated [`QueueError::Timeout`]) from "failed" (its own error).
#[derive(Debug, Error)]
pub enum QueueError {
    /// The per-task deadline elapsed before the work completed.
    ///
    /// Carries the queue depth and active count at expiry so the caller can
    /// decide whether to retry with reduced scope.
    #[error("queue deadline elapsed before completion ({pending} pending, {active} active)")]
    Timeout { pending: usize, active: usize },

    /// The task was admitted but never produced a result (it panicked).
    #[error("task aborted before producing a result")]
    Aborted,
}

/// A unit of work waiting for admission.
///
/// The work closure is type-erased: it captures the caller's typed
/// completion channel internally and resolves it when the work finishes.
pub(crate) struct PendingTask {
    /// Monotonic sequence number, used to break fairness ties (oldest first).
    pub seq: u64,
    /// Owner this task counts against.
    pub owner: OwnerId,
    /// When the task was enqueued.
    pub enqueued_at: Instant,
    /// Runs the work and settles the caller's completion handle.
    pub run: Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>,
}

impl fmt::Debug for PendingTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingTask")
            .field("seq", &self.seq)
            .field("owner", &self.owner)
            .field("enqueued_at", &self.enqueued_at)
            .finish()
    }
}
