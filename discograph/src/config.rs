//! Settings for the queue, cache, and streaming search components.
//!
//! All components are constructed from explicit settings structs with
//! sensible defaults, so services can be wired up without any external
//! configuration source.

use std::time::Duration;

// =============================================================================
// Default Constants
// =============================================================================

/// Default number of tasks that may execute concurrently in the fair queue.
pub const DEFAULT_QUEUE_CAP: usize = 8;

/// Default memory ceiling for the memoization cache (64 MB).
pub const DEFAULT_CACHE_MAX_BYTES: usize = 64 * 1024 * 1024;

/// Default key-count ceiling for the memoization cache.
pub const DEFAULT_CACHE_MAX_KEYS: usize = 10_000;

/// Default interval between eviction sweeps, in seconds.
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

/// Default page size for remote catalog pagination.
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Default batch size when streaming from the local index.
pub const DEFAULT_BATCH_SIZE: usize = 20;

/// Default pacing delay between successive catalog page fetches.
///
/// The public metadata catalog asks clients to stay at or below one
/// request per second.
pub const DEFAULT_PACING_MS: u64 = 1_000;

/// Hard cap applied when a caller requests "all" releases.
pub const DEFAULT_HARD_CAP: usize = 500;

/// Default number of concurrently active streaming sessions.
pub const DEFAULT_MAX_SESSIONS: usize = 4;

// =============================================================================
// Settings
// =============================================================================

/// Fair request queue settings.
#[derive(Debug, Clone)]
pub struct QueueSettings {
    /// Maximum number of concurrently executing tasks.
    pub cap: usize,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            cap: DEFAULT_QUEUE_CAP,
        }
    }
}

impl QueueSettings {
    /// Create settings with the given concurrency cap.
    pub fn new(cap: usize) -> Self {
        Self { cap }
    }
}

/// Memoization cache settings.
#[derive(Debug, Clone)]
pub struct CacheSettings {
    /// Estimated-memory ceiling in bytes.
    pub max_bytes: usize,
    /// Key-count ceiling.
    pub max_keys: usize,
    /// Interval between eviction sweeps, in seconds.
    pub sweep_interval_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_CACHE_MAX_BYTES,
            max_keys: DEFAULT_CACHE_MAX_KEYS,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
        }
    }
}

impl CacheSettings {
    /// Set the memory ceiling in bytes.
    pub fn with_max_bytes(mut self, bytes: usize) -> Self {
        self.max_bytes = bytes;
        self
    }

    /// Set the key-count ceiling.
    pub fn with_max_keys(mut self, keys: usize) -> Self {
        self.max_keys = keys;
        self
    }

    /// Set the sweep interval in seconds.
    pub fn with_sweep_interval_secs(mut self, secs: u64) -> Self {
        self.sweep_interval_secs = secs;
        self
    }
}

/// Streaming search settings.
#[derive(Debug, Clone)]
pub struct SearchSettings {
    /// Page size for remote catalog pagination.
    pub page_size: usize,
    /// Batch size when streaming from the local index.
    pub batch_size: usize,
    /// Pacing delay inserted between successive catalog page fetches.
    pub pacing: Duration,
    /// Hard cap applied to "all" requests.
    pub hard_cap: usize,
    /// Maximum number of concurrently active streaming sessions.
    pub max_sessions: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            batch_size: DEFAULT_BATCH_SIZE,
            pacing: Duration::from_millis(DEFAULT_PACING_MS),
            hard_cap: DEFAULT_HARD_CAP,
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }
}

impl SearchSettings {
    /// Set the remote pagination page size.
    pub fn with_page_size(mut self, size: usize) -> Self {
        self.page_size = size;
        self
    }

    /// Set the local-index streaming batch size.
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Set the pacing delay between catalog page fetches.
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    /// Set the hard cap for "all" requests.
    pub fn with_hard_cap(mut self, cap: usize) -> Self {
        self.hard_cap = cap;
        self
    }

    /// Set the maximum number of concurrent streaming sessions.
    pub fn with_max_sessions(mut self, sessions: usize) -> Self {
        self.max_sessions = sessions;
        self
    }
}
