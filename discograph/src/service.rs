//! High-level facade wiring the queue, cache, and streaming search together.
//!
//! [`Discograph`] owns one [`FairQueue`] for ad-hoc lookups, one shared
//! [`MemoCache`] with a background sweep daemon, and one [`StreamingSearch`]
//! over the caller-supplied adapters. Most applications construct exactly
//! one of these and keep it for the life of the process.

use crate::adapters::{CoverArt, MediaManager, MetadataCatalog};
use crate::cache::{CacheStatistics, MemoCache, SweepDaemon};
use crate::config::{CacheSettings, QueueSettings, SearchSettings};
use crate::queue::{CostEstimate, FairQueue, OwnerId, QueueError, QueueStats};
use crate::search::{SearchEvent, SearchRequest, StreamingSearch};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

/// Capacity of the per-search event channel. Small enough that a stalled
/// consumer exerts backpressure on the producer instead of buffering the
/// whole result set.
const EVENT_CHANNEL_CAPACITY: usize = 32;

/// Settings for all three components.
#[derive(Debug, Clone, Default)]
pub struct ServiceConfig {
    pub queue: QueueSettings,
    pub cache: CacheSettings,
    pub search: SearchSettings,
}

/// The assembled search service.
pub struct Discograph<C, M, A> {
    queue: FairQueue,
    cache: Arc<MemoCache>,
    sweeper: SweepDaemon,
    search: Arc<StreamingSearch<C, M, A>>,
}

impl<C, M, A> Discograph<C, M, A>
where
    C: MetadataCatalog + 'static,
    M: MediaManager + 'static,
    A: CoverArt + 'static,
{
    /// Assembles the service and starts the cache sweep daemon.
    pub fn new(config: ServiceConfig, catalog: C, manager: M, cover: A) -> Self {
        let cache = Arc::new(MemoCache::new(config.cache.clone()));
        let sweeper = SweepDaemon::start(cache.clone(), config.cache.sweep_interval_secs);
        let queue = FairQueue::new(config.queue.cap);
        let search = Arc::new(StreamingSearch::new(
            config.search,
            catalog,
            manager,
            cover,
        ));

        info!(
            queue_cap = config.queue.cap,
            cache_max_keys = config.cache.max_keys,
            "service assembled"
        );

        Self {
            queue,
            cache,
            sweeper,
            search,
        }
    }

    /// Starts a streaming search and returns its event channel.
    ///
    /// The search runs on its own task; dropping the receiver cancels it.
    /// Must be called from within a tokio runtime.
    pub fn search(&self, request: SearchRequest) -> mpsc::Receiver<SearchEvent> {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let search = self.search.clone();
        tokio::spawn(async move {
            search.run(request, tx).await;
        });
        rx
    }

    /// Runs an ad-hoc lookup through the fair queue under a deadline sized
    /// from the caller's cost estimate.
    pub async fn lookup<T, F, Fut>(
        &self,
        owner: impl Into<OwnerId>,
        estimate: CostEstimate,
        work: F,
    ) -> Result<T, QueueError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        self.queue.submit(owner, estimate.timeout(), work).await
    }

    /// The shared fair queue.
    pub fn queue(&self) -> &FairQueue {
        &self.queue
    }

    /// The shared memoization cache.
    pub fn cache(&self) -> &Arc<MemoCache> {
        &self.cache
    }

    /// Snapshot of queue occupancy.
    pub fn queue_stats(&self) -> QueueStats {
        self.queue.stats()
    }

    /// Snapshot of cache effectiveness.
    pub fn cache_statistics(&self) -> CacheStatistics {
        self.cache.statistics()
    }

    /// Cancels running searches and stops the sweep daemon. The daemon
    /// thread is joined when the service is dropped.
    pub fn shutdown(&self) {
        self.search.shutdown();
        self.sweeper.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{AdapterError, AlbumStatus, ArtistRef, CatalogRelease, ManagedArtist};
    use std::collections::HashMap;
    use std::time::Duration;

    struct EmptyCatalog;

    impl MetadataCatalog for EmptyCatalog {
        async fn search_artist(&self, name: &str) -> Result<Option<ArtistRef>, AdapterError> {
            Ok(Some(ArtistRef {
                id: "artist-1".to_string(),
                name: name.to_string(),
            }))
        }

        async fn releases_by_artist(
            &self,
            _artist_id: &str,
            _page_size: usize,
            _offset: usize,
        ) -> Result<Vec<CatalogRelease>, AdapterError> {
            Ok(vec![])
        }
    }

    struct EmptyManager;

    impl MediaManager for EmptyManager {
        async fn find_artist_by_external_id(
            &self,
            _external_id: &str,
        ) -> Result<Option<ManagedArtist>, AdapterError> {
            Ok(None)
        }

        async fn list_albums_with_status(
            &self,
            _artist: &ManagedArtist,
        ) -> Result<HashMap<String, AlbumStatus>, AdapterError> {
            Ok(HashMap::new())
        }
    }

    struct EmptyCovers;

    impl CoverArt for EmptyCovers {
        async fn lookup(&self, _release_id: &str) -> Result<Option<String>, AdapterError> {
            Ok(None)
        }
    }

    fn service() -> Discograph<EmptyCatalog, EmptyManager, EmptyCovers> {
        Discograph::new(
            ServiceConfig::default(),
            EmptyCatalog,
            EmptyManager,
            EmptyCovers,
        )
    }

    #[tokio::test]
    async fn test_search_streams_to_completion() {
        let service = service();
        let mut rx = service.search(SearchRequest::new("Nirvana"));

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }

        assert!(matches!(events.first(), Some(SearchEvent::Start { .. })));
        assert!(matches!(
            events.last(),
            Some(SearchEvent::Complete { total: 0, .. })
        ));
    }

    #[tokio::test]
    async fn test_lookup_runs_through_queue() {
        let service = service();
        let estimate = CostEstimate::new(1, Duration::from_millis(10));

        let value = service
            .lookup("owner-a", estimate, || async { 41 + 1 })
            .await
            .unwrap();
        assert_eq!(value, 42);

        let stats = service.queue_stats();
        assert_eq!(stats.pending, 0);
        assert_eq!(stats.active, 0);
    }

    #[tokio::test]
    async fn test_statistics_are_exposed() {
        let service = service();

        let statistics = service.cache_statistics();
        assert_eq!(statistics.stats.key_count, 0);
        assert_eq!(statistics.hit_rate_percent, 0.0);

        service.shutdown();
    }
}
