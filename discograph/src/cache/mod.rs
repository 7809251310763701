//! Bounded memoization cache.
//!
//! Memoizes expensive external lookups with TTL, a bounded key count, and a
//! bounded estimated memory footprint. Eviction is frequency-based: when a
//! sweep finds the cache over its ceiling, the quarter of entries with the
//! fewest hits is dropped.
//!
//! Keys are canonical: [`canonical_key`] serializes a parameter record with
//! recursively sorted object keys, so two callers building the same logical
//! request always share one entry regardless of field order.
//!
//! [`MemoCache::memoize`] is single-flight: concurrent callers missing the
//! same key await one in-flight producer instead of each invoking it.

mod daemon;
mod key;
mod stats;
mod store;

pub use daemon::SweepDaemon;
pub use key::canonical_key;
pub use stats::{CacheStatistics, CacheStats};
pub use store::{MemoCache, MemoizeError};
