//! Top-level error taxonomy.
//!
//! Each component defines its own error enum ([`QueueError`],
//! [`MemoizeError`], [`SearchError`], [`AdapterError`]); this module
//! provides the umbrella type for callers that need a single error across
//! them.
//!
//! The taxonomy separates four cases callers treat differently:
//! - `Validation`: bad input, surfaced immediately, never retried
//! - `Upstream`: an external service failed, not retried by the core
//! - `Timeout`: the fair queue's deadline elapsed, distinct so clients can
//!   retry with a narrower request
//! - `NotFound`: a domain case such as an unknown artist
//!
//! [`QueueError`]: crate::queue::QueueError
//! [`MemoizeError`]: crate::cache::MemoizeError
//! [`SearchError`]: crate::search::SearchError
//! [`AdapterError`]: crate::adapters::AdapterError

use crate::adapters::AdapterError;
use crate::queue::QueueError;
use crate::search::SearchError;
use thiserror::Error;

/// Umbrella error for single-shot lookups through the core.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Caller supplied bad or missing input.
    #[error("invalid request: {0}")]
    Validation(String),

    /// An external adapter returned non-success or a network failure.
    #[error(transparent)]
    Upstream(#[from] AdapterError),

    /// The fair queue's deadline elapsed before the work completed.
    #[error(transparent)]
    Timeout(#[from] QueueError),

    /// Domain-level not-found case.
    #[error("not found: {0}")]
    NotFound(String),
}

impl From<SearchError> for CoreError {
    fn from(e: SearchError) -> Self {
        match e {
            SearchError::EmptyArtistName => Self::Validation(e.to_string()),
            SearchError::ArtistNotFound(name) => Self::NotFound(format!("artist '{name}'")),
            SearchError::Upstream(e) => Self::Upstream(e),
            SearchError::Cancelled => Self::Validation("stream cancelled".to_string()),
        }
    }
}
