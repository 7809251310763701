//! Streaming catalog aggregator.
//!
//! Given an artist name, a target count, and an optional category filter,
//! the aggregator resolves the artist, consults the media manager for a
//! locally mirrored index of the artist's releases, and streams enriched
//! results in bounded batches with monotonic progress:
//!
//! - If the artist is locally known, the entire result set is built from
//!   the local index with zero catalog release-listing calls.
//! - Otherwise the catalog is paginated remotely with a fixed pacing delay
//!   between pages to respect the service's rate limits.
//!
//! Delivery is push-only over a bounded channel of [`SearchEvent`]s; the
//! caller cancels by dropping the receiver.

mod aggregator;
mod session;
mod types;

pub use aggregator::StreamingSearch;
pub use session::StreamSession;
pub use types::{
    parse_category_filter, EnrichedRelease, ReleaseType, SearchError, SearchEvent, SearchRequest,
    SourceMode, TargetCount,
};
