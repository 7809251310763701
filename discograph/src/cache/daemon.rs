//! Background daemon for periodic cache eviction sweeps.
//!
//! The daemon runs in a separate thread, decoupled from request handling,
//! and invokes [`MemoCache::sweep`] at a fixed interval.

use super::store::MemoCache;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Background daemon driving the cache's eviction sweep.
///
/// The daemon can be cleanly shut down by calling `shutdown()` or by
/// dropping the `SweepDaemon` instance.
pub struct SweepDaemon {
    /// Handle to the daemon thread
    thread_handle: Option<JoinHandle<()>>,
    /// Shutdown signal
    shutdown: Arc<AtomicBool>,
}

impl SweepDaemon {
    /// Start a new sweep daemon.
    ///
    /// # Arguments
    ///
    /// * `cache` - Arc to the cache to sweep
    /// * `interval_secs` - How often to sweep (in seconds)
    pub fn start(cache: Arc<MemoCache>, interval_secs: u64) -> Self {
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();

        let thread_handle = thread::Builder::new()
            .name("cache-sweep".to_string())
            .spawn(move || {
                Self::run_loop(cache, interval_secs, shutdown_clone);
            })
            .expect("Failed to spawn cache sweep daemon thread");

        info!("Cache sweep daemon started (interval: {}s)", interval_secs);

        Self {
            thread_handle: Some(thread_handle),
            shutdown,
        }
    }

    /// The main daemon loop.
    fn run_loop(cache: Arc<MemoCache>, interval_secs: u64, shutdown: Arc<AtomicBool>) {
        let interval = Duration::from_secs(interval_secs);

        // Sleep in short slices so shutdown stays responsive
        let check_interval = Duration::from_millis(250);
        let mut elapsed = Duration::ZERO;

        loop {
            if shutdown.load(Ordering::Relaxed) {
                debug!("Cache sweep daemon received shutdown signal");
                break;
            }

            thread::sleep(check_interval);
            elapsed += check_interval;

            if elapsed >= interval {
                elapsed = Duration::ZERO;

                let bytes_before = cache.estimated_bytes();
                cache.sweep();

                if bytes_before > cache.max_bytes() {
                    debug!(
                        "Cache was over limit: {} KB / {} KB, sweep ran ({} KB after)",
                        bytes_before / 1024,
                        cache.max_bytes() / 1024,
                        cache.estimated_bytes() / 1024
                    );
                }
            }
        }

        debug!("Cache sweep daemon stopped");
    }

    /// Signal the daemon to shut down.
    ///
    /// This is non-blocking. The daemon will stop at its next check interval.
    /// Call `join()` after this to wait for the thread to finish.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Wait for the daemon thread to finish.
    ///
    /// Should be called after `shutdown()` to ensure clean termination.
    pub fn join(&mut self) {
        if let Some(handle) = self.thread_handle.take() {
            if let Err(e) = handle.join() {
                warn!("Cache sweep daemon thread panicked: {:?}", e);
            }
        }
    }

    /// Check if the daemon is still running.
    pub fn is_running(&self) -> bool {
        self.thread_handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for SweepDaemon {
    fn drop(&mut self) {
        self.shutdown();
        self.join();
    }
}
