//! The fair queue scheduler.
//!
//! Tasks enter a pending list on submit. A scheduling pass runs whenever a
//! task is enqueued or an active task settles: it repeatedly picks the
//! pending task whose owner has the fewest currently-active tasks (ties
//! broken by enqueue order, oldest first) and admits it, until the pending
//! list is empty or the global active count reaches the cap.
//!
//! All bookkeeping lives inside one mutex'd critical section, so counts are
//! never torn even though admitted tasks run concurrently.

use super::task::{OwnerId, PendingTask, QueueError};
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::{debug, trace};

/// Snapshot of queue state for observability.
#[derive(Debug, Clone)]
pub struct QueueStats {
    /// Number of tasks waiting for admission.
    pub pending: usize,
    /// Number of tasks currently executing.
    pub active: usize,
    /// Configured concurrency cap.
    pub cap: usize,
    /// Currently-executing task count per owner.
    pub active_by_owner: HashMap<String, usize>,
}

#[derive(Default)]
struct Inner {
    pending: VecDeque<PendingTask>,
    active_by_owner: HashMap<OwnerId, usize>,
    active: usize,
    next_seq: u64,
}

struct Shared {
    cap: usize,
    inner: Mutex<Inner>,
}

/// Fair admission controller for async work.
///
/// Cloneable handle; all clones share the same queue. See the module docs
/// for the scheduling algorithm.
#[derive(Clone)]
pub struct FairQueue {
    shared: Arc<Shared>,
}

impl FairQueue {
    /// Creates a new queue with the given concurrency cap.
    pub fn new(cap: usize) -> Self {
        assert!(cap > 0, "cap must be > 0");
        Self {
            shared: Arc::new(Shared {
                cap,
                inner: Mutex::new(Inner::default()),
            }),
        }
    }

    /// Returns the configured concurrency cap.
    pub fn cap(&self) -> usize {
        self.shared.cap
    }

    /// Submits work and waits for its result, up to `timeout` from enqueue.
    ///
    /// The work's output is returned unchanged. If the deadline elapses
    /// before the work completes, the task settles exactly once as
    /// [`QueueError::Timeout`]: a still-pending task is withdrawn and never
    /// runs, and a late result from an already-running task is discarded.
    pub async fn submit<T, F, Fut>(
        &self,
        owner: impl Into<OwnerId>,
        timeout: Duration,
        work: F,
    ) -> Result<T, QueueError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let owner = owner.into();
        let (tx, rx) = oneshot::channel::<T>();

        let seq = {
            let mut inner = self.shared.inner.lock().unwrap();
            let seq = inner.next_seq;
            inner.next_seq += 1;
            inner.pending.push_back(PendingTask {
                seq,
                owner: owner.clone(),
                enqueued_at: Instant::now(),
                run: Box::new(move || {
                    Box::pin(async move {
                        // Receiver may have timed out; a failed send simply
                        // discards the late result.
                        let _ = tx.send(work().await);
                    })
                }),
            });
            trace!(owner = %owner, seq, pending = inner.pending.len(), "task enqueued");
            seq
        };

        self.schedule();

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(_)) => Err(QueueError::Aborted),
            Err(_) => {
                self.withdraw(seq);
                let stats = self.stats();
                debug!(
                    owner = %owner,
                    seq,
                    pending = stats.pending,
                    active = stats.active,
                    "task deadline elapsed"
                );
                Err(QueueError::Timeout {
                    pending: stats.pending,
                    active: stats.active,
                })
            }
        }
    }

    /// Returns a snapshot of queue state.
    pub fn stats(&self) -> QueueStats {
        let inner = self.shared.inner.lock().unwrap();
        QueueStats {
            pending: inner.pending.len(),
            active: inner.active,
            cap: self.shared.cap,
            active_by_owner: inner
                .active_by_owner
                .iter()
                .map(|(owner, count)| (owner.as_str().to_string(), *count))
                .collect(),
        }
    }

    /// Removes a still-pending task after its deadline elapsed.
    ///
    /// No-op if the task was already admitted.
    fn withdraw(&self, seq: u64) {
        let mut inner = self.shared.inner.lock().unwrap();
        inner.pending.retain(|t| t.seq != seq);
    }

    /// Runs one scheduling pass, admitting tasks while capacity remains.
    fn schedule(&self) {
        loop {
            let task = {
                let mut inner = self.shared.inner.lock().unwrap();
                if inner.active >= self.shared.cap {
                    return;
                }
                let Some(idx) = pick_fairest(&inner) else {
                    return;
                };
                let task = inner.pending.remove(idx).expect("picked index exists");
                *inner.active_by_owner.entry(task.owner.clone()).or_insert(0) += 1;
                inner.active += 1;
                trace!(
                    owner = %task.owner,
                    seq = task.seq,
                    active = inner.active,
                    waited_ms = task.enqueued_at.elapsed().as_millis() as u64,
                    "task admitted"
                );
                task
            };

            let guard = SettleGuard {
                queue: self.clone(),
                owner: task.owner.clone(),
            };
            tokio::spawn(async move {
                // Guard settles even if the work panics, so the owner's
                // slot is always returned.
                let _guard = guard;
                (task.run)().await;
            });
        }
    }

    /// Settles a finished task: returns its slot and re-runs scheduling.
    fn on_settle(&self, owner: &OwnerId) {
        {
            let mut inner = self.shared.inner.lock().unwrap();
            match inner.active_by_owner.get_mut(owner) {
                Some(count) if *count > 1 => *count -= 1,
                Some(_) => {
                    inner.active_by_owner.remove(owner);
                }
                None => {}
            }
            inner.active = inner.active.saturating_sub(1);
        }
        self.schedule();
    }
}

impl std::fmt::Debug for FairQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stats = self.stats();
        f.debug_struct("FairQueue")
            .field("cap", &stats.cap)
            .field("active", &stats.active)
            .field("pending", &stats.pending)
            .finish()
    }
}

/// Picks the pending task whose owner has the fewest active tasks,
/// breaking ties by enqueue order (lowest sequence number).
fn pick_fairest(inner: &Inner) -> Option<usize> {
    let mut best: Option<(usize, usize, u64)> = None;
    for (idx, task) in inner.pending.iter().enumerate() {
        let owner_active = inner
            .active_by_owner
            .get(&task.owner)
            .copied()
            .unwrap_or(0);
        let better = match best {
            None => true,
            Some((_, best_active, best_seq)) => {
                owner_active < best_active || (owner_active == best_active && task.seq < best_seq)
            }
        };
        if better {
            best = Some((idx, owner_active, task.seq));
        }
    }
    best.map(|(idx, _, _)| idx)
}

/// Returns the owner's slot when the spawned task finishes or panics.
struct SettleGuard {
    queue: FairQueue,
    owner: OwnerId,
}

impl Drop for SettleGuard {
    fn drop(&mut self) {
        self.queue.on_settle(&self.owner);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    #[should_panic(expected = "cap must be > 0")]
    fn test_zero_cap_panics() {
        FairQueue::new(0);
    }

    #[tokio::test]
    async fn test_submit_returns_work_output() {
        let queue = FairQueue::new(2);
        let result = queue
            .submit("a", Duration::from_secs(1), || async { 41 + 1 })
            .await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_task_errors_propagate_unchanged() {
        let queue = FairQueue::new(2);
        let result: Result<Result<u32, String>, QueueError> = queue
            .submit("a", Duration::from_secs(1), || async {
                Err("upstream broke".to_string())
            })
            .await;
        assert_eq!(result.unwrap(), Err("upstream broke".to_string()));
    }

    #[tokio::test]
    async fn test_pending_task_times_out_and_never_runs() {
        let queue = FairQueue::new(1);
        let ran = Arc::new(AtomicUsize::new(0));

        // Occupy the only slot
        let blocker = {
            let queue = queue.clone();
            tokio::spawn(async move {
                queue
                    .submit("hog", Duration::from_secs(5), || async {
                        tokio::time::sleep(Duration::from_millis(300)).await;
                    })
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        let ran_clone = ran.clone();
        let result = queue
            .submit("late", Duration::from_millis(50), move || async move {
                ran_clone.fetch_add(1, Ordering::SeqCst);
            })
            .await;

        assert!(matches!(result, Err(QueueError::Timeout { .. })));

        // Let the blocker finish and any stray scheduling settle
        blocker.await.unwrap().unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(ran.load(Ordering::SeqCst), 0, "withdrawn task must not run");
    }

    #[tokio::test]
    async fn test_timeout_error_reports_queue_depth() {
        let queue = FairQueue::new(1);

        let hog = {
            let queue = queue.clone();
            tokio::spawn(async move {
                queue
                    .submit("hog", Duration::from_secs(5), || async {
                        tokio::time::sleep(Duration::from_millis(200)).await;
                    })
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        let result = queue
            .submit("late", Duration::from_millis(40), || async {})
            .await;

        match result {
            Err(QueueError::Timeout { active, .. }) => assert_eq!(active, 1),
            other => panic!("expected timeout, got {:?}", other.is_ok()),
        }
        hog.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_cap_never_exceeded() {
        let queue = FairQueue::new(3);
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for i in 0..12 {
            let queue = queue.clone();
            let in_flight = in_flight.clone();
            let peak = peak.clone();
            handles.push(tokio::spawn(async move {
                queue
                    .submit(format!("owner-{}", i % 4), Duration::from_secs(5), move || async move {
                        let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        in_flight.fetch_sub(1, Ordering::SeqCst);
                    })
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= 3, "active exceeded cap");
        let stats = queue.stats();
        assert_eq!(stats.active, 0);
        assert_eq!(stats.pending, 0);
        assert!(stats.active_by_owner.is_empty());
    }

    #[tokio::test]
    async fn test_fairness_prefers_idle_owner() {
        let queue = FairQueue::new(1);
        let order = Arc::new(Mutex::new(Vec::new()));

        // Fill the slot so everything below queues behind it.
        let blocker = {
            let queue = queue.clone();
            tokio::spawn(async move {
                queue
                    .submit("busy", Duration::from_secs(5), || async {
                        tokio::time::sleep(Duration::from_millis(80)).await;
                    })
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        // "busy" enqueues a second task first, then "idle" enqueues one.
        let mut handles = Vec::new();
        for owner in ["busy", "idle"] {
            let queue = queue.clone();
            let order = order.clone();
            handles.push(tokio::spawn(async move {
                queue
                    .submit(owner, Duration::from_secs(5), move || async move {
                        order.lock().unwrap().push(owner);
                    })
                    .await
            }));
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        blocker.await.unwrap().unwrap();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        // When the slot freed up, "busy" still had an active task, so the
        // idle owner's task must have been admitted first.
        assert_eq!(*order.lock().unwrap(), vec!["idle", "busy"]);
    }

    #[tokio::test]
    async fn test_ties_broken_by_enqueue_order() {
        let queue = FairQueue::new(1);
        let order = Arc::new(Mutex::new(Vec::new()));

        let blocker = {
            let queue = queue.clone();
            tokio::spawn(async move {
                queue
                    .submit("hog", Duration::from_secs(5), || async {
                        tokio::time::sleep(Duration::from_millis(60)).await;
                    })
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(15)).await;

        let mut handles = Vec::new();
        for owner in ["first", "second", "third"] {
            let queue = queue.clone();
            let order = order.clone();
            handles.push(tokio::spawn(async move {
                queue
                    .submit(owner, Duration::from_secs(5), move || async move {
                        order.lock().unwrap().push(owner);
                    })
                    .await
            }));
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        blocker.await.unwrap().unwrap();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_stats_reflect_active_tasks() {
        let queue = FairQueue::new(2);

        let handle = {
            let queue = queue.clone();
            tokio::spawn(async move {
                queue
                    .submit("watcher", Duration::from_secs(5), || async {
                        tokio::time::sleep(Duration::from_millis(100)).await;
                    })
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        let stats = queue.stats();
        assert_eq!(stats.cap, 2);
        assert_eq!(stats.active, 1);
        assert_eq!(stats.active_by_owner.get("watcher"), Some(&1));

        handle.await.unwrap().unwrap();
    }
}
