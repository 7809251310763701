//! In-memory memoization store with TTL and frequency-based eviction.

use super::key::canonical_key;
use super::stats::{CacheStatistics, CacheStats};
use crate::config::CacheSettings;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::debug;

/// Errors from [`MemoCache::memoize`].
///
/// A failing producer leaves the key unpopulated, so the next call retries
/// naturally.
#[derive(Debug, Error)]
pub enum MemoizeError<E: std::error::Error> {
    /// The producer failed; propagated unchanged.
    #[error(transparent)]
    Producer(#[from] E),

    /// The produced value could not be encoded or decoded as JSON.
    #[error("cached value codec failed: {0}")]
    Codec(String),
}

/// Entry in the memoization cache.
#[derive(Debug, Clone)]
struct CacheEntry {
    /// Cached value.
    value: Value,
    /// Absolute expiry instant.
    expires_at: Instant,
    /// Number of times this entry was read, used for eviction ranking.
    hit_count: u64,
    /// Serialized size, summed into the estimated memory footprint.
    size_bytes: usize,
}

#[derive(Default)]
struct CacheIndex {
    entries: HashMap<String, CacheEntry>,
    total_bytes: usize,
    /// Keys with a producer currently in flight, each with its waiters.
    ///
    /// `None` delivered to a waiter means the producer failed or vanished;
    /// the waiter retries and may become the next leader.
    inflight: HashMap<String, Vec<oneshot::Sender<Option<Value>>>>,
}

/// Capacity/TTL/memory-bounded memoization store.
///
/// Values are stored as JSON with their serialized length as the memory
/// estimate. Reads are lazy-expiring: a `get` on an expired key removes it
/// and reports a miss. The periodic eviction sweep is driven externally by
/// [`SweepDaemon`].
///
/// [`SweepDaemon`]: super::SweepDaemon
pub struct MemoCache {
    settings: CacheSettings,
    index: Mutex<CacheIndex>,
    stats: Mutex<CacheStats>,
}

/// Outcome of a locked cache probe during `memoize`.
enum Role {
    /// Fresh value found.
    Hit(Value),
    /// Another caller is producing this key; wait for it.
    Wait(oneshot::Receiver<Option<Value>>),
    /// This caller produces the value.
    Lead,
}

impl MemoCache {
    /// Create a new cache with the given settings.
    pub fn new(settings: CacheSettings) -> Self {
        Self {
            settings,
            index: Mutex::new(CacheIndex::default()),
            stats: Mutex::new(CacheStats::new()),
        }
    }

    /// Get a cached value, updating hit/miss counters.
    ///
    /// An expired entry is removed and reported as a miss.
    pub fn get(&self, key: &str) -> Option<Value> {
        let now = Instant::now();
        let mut index = self.index.lock().unwrap();

        let expired = matches!(index.entries.get(key), Some(e) if e.expires_at <= now);
        if expired {
            if let Some(old) = index.entries.remove(key) {
                index.total_bytes = index.total_bytes.saturating_sub(old.size_bytes);
            }
        }

        if let Some(entry) = index.entries.get_mut(key) {
            entry.hit_count += 1;
            let value = entry.value.clone();
            self.stats.lock().unwrap().record_hit();
            return Some(value);
        }

        let (bytes, keys) = (index.total_bytes, index.entries.len());
        let mut stats = self.stats.lock().unwrap();
        stats.record_miss();
        if expired {
            stats.record_expired(1);
        }
        stats.update_size(bytes, keys);
        None
    }

    /// Insert or overwrite a value, resetting its expiry.
    pub fn set(&self, key: impl Into<String>, value: Value, ttl: Duration) {
        let key = key.into();
        let size_bytes = value.to_string().len();
        let mut index = self.index.lock().unwrap();

        if let Some(old) = index.entries.insert(
            key,
            CacheEntry {
                value,
                expires_at: Instant::now() + ttl,
                hit_count: 0,
                size_bytes,
            },
        ) {
            index.total_bytes = index.total_bytes.saturating_sub(old.size_bytes);
        }
        index.total_bytes += size_bytes;

        let (bytes, keys) = (index.total_bytes, index.entries.len());
        self.stats.lock().unwrap().update_size(bytes, keys);
    }

    /// Remove a key. Returns true if it was present.
    pub fn delete(&self, key: &str) -> bool {
        let mut index = self.index.lock().unwrap();
        let removed = index.entries.remove(key);
        if let Some(entry) = &removed {
            index.total_bytes = index.total_bytes.saturating_sub(entry.size_bytes);
        }
        let (bytes, keys) = (index.total_bytes, index.entries.len());
        self.stats.lock().unwrap().update_size(bytes, keys);
        removed.is_some()
    }

    /// Remove all entries and reset statistics.
    pub fn flush(&self) {
        let mut index = self.index.lock().unwrap();
        index.entries.clear();
        index.total_bytes = 0;
        *self.stats.lock().unwrap() = CacheStats::new();
    }

    /// Memoize a lookup under a canonical `(namespace, params)` key.
    ///
    /// On a hit the cached value is returned. On a miss the producer runs
    /// and its result is stored with `ttl`. Concurrent callers missing the
    /// same key await the single in-flight producer instead of invoking
    /// their own; if that producer fails, each waiter retries and one of
    /// them becomes the next leader.
    pub async fn memoize<T, E, F, Fut>(
        &self,
        namespace: &str,
        params: &Value,
        ttl: Duration,
        producer: F,
    ) -> Result<T, MemoizeError<E>>
    where
        T: Serialize + DeserializeOwned,
        E: std::error::Error,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let key = canonical_key(namespace, params);
        let mut producer = Some(producer);

        loop {
            match self.lookup_or_join(&key) {
                Role::Hit(value) => {
                    return serde_json::from_value(value)
                        .map_err(|e| MemoizeError::Codec(e.to_string()));
                }
                Role::Wait(rx) => match rx.await {
                    Ok(Some(value)) => {
                        return serde_json::from_value(value)
                            .map_err(|e| MemoizeError::Codec(e.to_string()));
                    }
                    // Leader failed or was dropped mid-produce; retry.
                    _ => continue,
                },
                Role::Lead => {
                    let guard = InflightGuard {
                        cache: self,
                        key: key.clone(),
                        armed: true,
                    };
                    let produce = producer.take().expect("leader role entered once");
                    match produce().await {
                        Ok(value) => match serde_json::to_value(&value) {
                            Ok(json) => {
                                self.set(&key, json.clone(), ttl);
                                guard.complete(Some(json));
                                return Ok(value);
                            }
                            Err(e) => {
                                guard.complete(None);
                                return Err(MemoizeError::Codec(e.to_string()));
                            }
                        },
                        Err(e) => {
                            guard.complete(None);
                            return Err(MemoizeError::Producer(e));
                        }
                    }
                }
            }
        }
    }

    /// Eviction sweep: purge expired entries, then if the cache exceeds its
    /// memory or key ceiling, evict the quarter of entries with the fewest
    /// hits (ties broken arbitrarily).
    ///
    /// Called periodically by [`SweepDaemon`].
    ///
    /// [`SweepDaemon`]: super::SweepDaemon
    pub fn sweep(&self) {
        let now = Instant::now();
        let mut index = self.index.lock().unwrap();

        let expired_keys: Vec<String> = index
            .entries
            .iter()
            .filter(|(_, e)| e.expires_at <= now)
            .map(|(k, _)| k.clone())
            .collect();
        for key in &expired_keys {
            index.entries.remove(key);
        }

        // Recompute the estimate from scratch so drift cannot accumulate
        index.total_bytes = index.entries.values().map(|e| e.size_bytes).sum();

        let mut evicted = 0u64;
        let over_memory = index.total_bytes > self.settings.max_bytes;
        let over_keys = index.entries.len() > self.settings.max_keys;
        if (over_memory || over_keys) && !index.entries.is_empty() {
            let mut ranked: Vec<(String, u64)> = index
                .entries
                .iter()
                .map(|(k, e)| (k.clone(), e.hit_count))
                .collect();
            ranked.sort_by_key(|(_, hits)| *hits);

            let count = (ranked.len() / 4).max(1);
            for (key, _) in ranked.into_iter().take(count) {
                if let Some(entry) = index.entries.remove(&key) {
                    index.total_bytes = index.total_bytes.saturating_sub(entry.size_bytes);
                    evicted += 1;
                }
            }
            debug!(
                evicted,
                remaining = index.entries.len(),
                bytes = index.total_bytes,
                "cache eviction sweep"
            );
        }

        let (bytes, keys) = (index.total_bytes, index.entries.len());
        let mut stats = self.stats.lock().unwrap();
        stats.record_expired(expired_keys.len() as u64);
        stats.record_evictions(evicted);
        stats.update_size(bytes, keys);
    }

    /// Current number of keys.
    pub fn key_count(&self) -> usize {
        self.index.lock().unwrap().entries.len()
    }

    /// Current estimated memory footprint in bytes.
    pub fn estimated_bytes(&self) -> usize {
        self.index.lock().unwrap().total_bytes
    }

    /// Configured memory ceiling in bytes.
    pub fn max_bytes(&self) -> usize {
        self.settings.max_bytes
    }

    /// Get a copy of the raw statistics.
    pub fn stats(&self) -> CacheStats {
        self.stats.lock().unwrap().clone()
    }

    /// Get a statistics snapshot for reporting.
    pub fn statistics(&self) -> CacheStatistics {
        CacheStatistics::from_stats(&self.stats())
    }

    /// Probe the cache for `memoize`: hit, join an in-flight producer, or
    /// become the leader. Runs entirely inside the index lock.
    fn lookup_or_join(&self, key: &str) -> Role {
        let now = Instant::now();
        let mut index = self.index.lock().unwrap();

        let expired = matches!(index.entries.get(key), Some(e) if e.expires_at <= now);
        if expired {
            if let Some(old) = index.entries.remove(key) {
                index.total_bytes = index.total_bytes.saturating_sub(old.size_bytes);
            }
        }

        if let Some(entry) = index.entries.get_mut(key) {
            entry.hit_count += 1;
            let value = entry.value.clone();
            self.stats.lock().unwrap().record_hit();
            return Role::Hit(value);
        }

        {
            let (bytes, keys) = (index.total_bytes, index.entries.len());
            let mut stats = self.stats.lock().unwrap();
            stats.record_miss();
            if expired {
                stats.record_expired(1);
            }
            stats.update_size(bytes, keys);
        }

        if let Some(waiters) = index.inflight.get_mut(key) {
            let (tx, rx) = oneshot::channel();
            waiters.push(tx);
            Role::Wait(rx)
        } else {
            index.inflight.insert(key.to_string(), Vec::new());
            Role::Lead
        }
    }

    /// Resolve an in-flight key, waking all waiters with the outcome.
    fn finish_inflight(&self, key: &str, outcome: Option<Value>) {
        let waiters = {
            let mut index = self.index.lock().unwrap();
            index.inflight.remove(key).unwrap_or_default()
        };
        for tx in waiters {
            let _ = tx.send(outcome.clone());
        }
    }
}

impl std::fmt::Debug for MemoCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoCache")
            .field("keys", &self.key_count())
            .field("bytes", &self.estimated_bytes())
            .field("max_bytes", &self.settings.max_bytes)
            .finish()
    }
}

/// Wakes waiters even if the leader's future is dropped mid-produce, so no
/// waiter hangs on a vanished producer.
struct InflightGuard<'a> {
    cache: &'a MemoCache,
    key: String,
    armed: bool,
}

impl InflightGuard<'_> {
    fn complete(mut self, outcome: Option<Value>) {
        self.armed = false;
        self.cache.finish_inflight(&self.key, outcome);
    }
}

impl Drop for InflightGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.cache.finish_inflight(&self.key, None);
        }
    }
}
