//! Cache statistics tracking and reporting.

use std::time::Instant;

/// Cache statistics for monitoring and debugging.
///
/// Counters run for the life of the process and are reset only by an
/// explicit flush.
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expired: u64,
    pub key_count: usize,
    pub estimated_bytes: usize,
    pub created_at: Instant,
}

impl Default for CacheStats {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheStats {
    /// Create a new statistics tracker.
    pub fn new() -> Self {
        Self {
            hits: 0,
            misses: 0,
            evictions: 0,
            expired: 0,
            key_count: 0,
            estimated_bytes: 0,
            created_at: Instant::now(),
        }
    }

    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Estimated memory footprint in megabytes.
    pub fn estimated_memory_mb(&self) -> f64 {
        self.estimated_bytes as f64 / (1024.0 * 1024.0)
    }

    /// Get the uptime duration since statistics started.
    pub fn uptime(&self) -> std::time::Duration {
        self.created_at.elapsed()
    }

    /// Record a cache hit.
    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    /// Record a cache miss.
    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    /// Record evicted entries.
    pub fn record_evictions(&mut self, count: u64) {
        self.evictions += count;
    }

    /// Record entries removed by expiry.
    pub fn record_expired(&mut self, count: u64) {
        self.expired += count;
    }

    /// Update size metrics after an insert, removal, or sweep.
    pub fn update_size(&mut self, estimated_bytes: usize, key_count: usize) {
        self.estimated_bytes = estimated_bytes;
        self.key_count = key_count;
    }
}

/// Snapshot of cache statistics for reporting.
#[derive(Debug, Clone)]
pub struct CacheStatistics {
    pub stats: CacheStats,
    pub hit_rate_percent: f64,
    pub estimated_memory_mb: f64,
    pub uptime_secs: u64,
}

impl CacheStatistics {
    /// Create a statistics snapshot from current stats.
    pub fn from_stats(stats: &CacheStats) -> Self {
        Self {
            stats: stats.clone(),
            hit_rate_percent: stats.hit_rate() * 100.0,
            estimated_memory_mb: stats.estimated_memory_mb(),
            uptime_secs: stats.uptime().as_secs(),
        }
    }

    /// Format statistics as a human-readable string.
    pub fn format(&self) -> String {
        let stats = &self.stats;

        format!(
            r#"Discograph Cache Statistics

MEMOIZATION CACHE
  Keys:        {}
  Size:        {:.2} MB
  Hits:        {}
  Misses:      {}
  Hit Rate:    {:.1}%
  Evictions:   {}
  Expired:     {}

OVERALL
  Uptime:      {}s
"#,
            stats.key_count,
            self.estimated_memory_mb,
            stats.hits,
            stats.misses,
            self.hit_rate_percent,
            stats.evictions,
            stats.expired,
            self.uptime_secs,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_stats_default() {
        let stats = CacheStats::default();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.evictions, 0);
        assert_eq!(stats.key_count, 0);
    }

    #[test]
    fn test_hit_rate_no_requests() {
        let stats = CacheStats::new();
        assert_eq!(stats.hit_rate(), 0.0);
    }

    #[test]
    fn test_hit_rate_mixed() {
        let mut stats = CacheStats::new();
        stats.hits = 75;
        stats.misses = 25;
        assert_eq!(stats.hit_rate(), 0.75);
    }

    #[test]
    fn test_record_hits_and_misses() {
        let mut stats = CacheStats::new();
        stats.record_hit();
        stats.record_hit();
        stats.record_miss();

        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_record_evictions_and_expired() {
        let mut stats = CacheStats::new();
        stats.record_evictions(5);
        stats.record_expired(3);

        assert_eq!(stats.evictions, 5);
        assert_eq!(stats.expired, 3);
    }

    #[test]
    fn test_update_size() {
        let mut stats = CacheStats::new();
        stats.update_size(2 * 1024 * 1024, 45);

        assert_eq!(stats.estimated_bytes, 2 * 1024 * 1024);
        assert_eq!(stats.key_count, 45);
        assert!((stats.estimated_memory_mb() - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_uptime_increases() {
        let stats = CacheStats::new();
        std::thread::sleep(std::time::Duration::from_millis(10));
        assert!(stats.uptime().as_millis() >= 10);
    }

    #[test]
    fn test_statistics_snapshot() {
        let mut stats = CacheStats::new();
        stats.hits = 90;
        stats.misses = 10;

        let snapshot = CacheStatistics::from_stats(&stats);
        assert_eq!(snapshot.hit_rate_percent, 90.0);
        assert_eq!(snapshot.stats.hits, 90);
    }

    #[test]
    fn test_statistics_format() {
        let mut stats = CacheStats::new();
        stats.hits = 100;
        stats.misses = 10;
        stats.key_count = 50;
        stats.estimated_bytes = 500_000;

        let formatted = CacheStatistics::from_stats(&stats).format();
        assert!(formatted.contains("Keys:        50"));
        assert!(formatted.contains("MEMOIZATION CACHE"));
        assert!(formatted.contains("OVERALL"));
    }
}
