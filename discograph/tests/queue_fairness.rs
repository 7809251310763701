//! End-to-end fairness behavior of the request queue.

use discograph::queue::{CostEstimate, FairQueue, QueueError};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

const TASK_DURATION: Duration = Duration::from_millis(100);

/// Submits one task that records its label when it runs.
fn submit_labelled(
    queue: &FairQueue,
    owner: &'static str,
    label: &'static str,
    order: Arc<Mutex<Vec<&'static str>>>,
) -> tokio::task::JoinHandle<Result<(), QueueError>> {
    let queue = queue.clone();
    tokio::spawn(async move {
        queue
            .submit(owner, Duration::from_secs(10), move || async move {
                order.lock().unwrap().push(label);
                tokio::time::sleep(TASK_DURATION).await;
            })
            .await
    })
}

/// Three owners compete for two slots. One owner floods the queue with
/// three tasks before the other two arrive; fairness still admits each
/// newcomer ahead of the flooder's backlog.
#[tokio::test]
async fn test_two_slots_three_owners_share_fairly() {
    let queue = FairQueue::new(2);
    let order = Arc::new(Mutex::new(Vec::new()));

    let mut handles = Vec::new();
    for label in ["a1", "a2", "a3"] {
        handles.push(submit_labelled(&queue, "owner-a", label, order.clone()));
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    handles.push(submit_labelled(&queue, "owner-b", "b1", order.clone()));
    tokio::time::sleep(Duration::from_millis(10)).await;
    handles.push(submit_labelled(&queue, "owner-c", "c1", order.clone()));

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let order = order.lock().unwrap().clone();
    assert_eq!(order.len(), 5);

    // a1 and a2 grabbed both free slots before b and c arrived. At the
    // first settle owner-a still holds a slot, so idle owner-b jumps the
    // flooder's backlog even though a3 was enqueued earlier.
    let position = |label: &str| order.iter().position(|l| *l == label).unwrap();
    assert!(order[..2].contains(&"a1") && order[..2].contains(&"a2"));
    assert!(position("b1") < position("a3"), "order was {order:?}");
    assert!(position("b1") < position("c1"), "order was {order:?}");
}

/// With two slots and 100ms tasks, five tasks need three settling waves,
/// so the whole run takes roughly 300ms, not 500ms and not 100ms.
#[tokio::test]
async fn test_two_slots_run_five_tasks_in_three_waves() {
    let queue = FairQueue::new(2);
    let order = Arc::new(Mutex::new(Vec::new()));
    let started = Instant::now();

    let mut handles = Vec::new();
    for (owner, label) in [
        ("owner-a", "a1"),
        ("owner-a", "a2"),
        ("owner-b", "b1"),
        ("owner-b", "b2"),
        ("owner-c", "c1"),
    ] {
        handles.push(submit_labelled(&queue, owner, label, order.clone()));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let elapsed = started.elapsed();
    assert!(
        elapsed >= TASK_DURATION * 3,
        "five tasks through two slots finished too fast: {elapsed:?}"
    );
    assert!(
        elapsed < TASK_DURATION * 5,
        "tasks did not run concurrently: {elapsed:?}"
    );
}

/// Three owners submit one task each against two slots: exactly two run
/// at once, and the third starts only when a slot settles, so the run
/// takes two task durations, not one and not three.
#[tokio::test]
async fn test_third_owner_waits_for_a_free_slot() {
    use std::sync::atomic::{AtomicUsize, Ordering};

    let queue = FairQueue::new(2);
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let started = Instant::now();

    let mut handles = Vec::new();
    for owner in ["owner-a", "owner-b", "owner-c"] {
        let queue = queue.clone();
        let in_flight = in_flight.clone();
        let peak = peak.clone();
        handles.push(tokio::spawn(async move {
            queue
                .submit(owner, Duration::from_secs(10), move || async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(TASK_DURATION).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                })
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let elapsed = started.elapsed();
    assert_eq!(peak.load(Ordering::SeqCst), 2);
    assert!(
        elapsed >= TASK_DURATION * 2,
        "third task must wait for a slot: {elapsed:?}"
    );
    assert!(
        elapsed < TASK_DURATION * 3,
        "first two tasks must overlap: {elapsed:?}"
    );
}

/// A deadline sized from a cost estimate admits work that fits and times
/// out work that lies about its cost.
#[tokio::test]
async fn test_cost_sized_deadline() {
    let queue = FairQueue::new(1);

    // Honest estimate: one quick call, clamped up to the 5s floor.
    let timeout = CostEstimate::new(1, Duration::from_millis(50)).timeout();
    let result = queue
        .submit("honest", timeout, || async {
            tokio::time::sleep(Duration::from_millis(30)).await;
            "done"
        })
        .await;
    assert_eq!(result.unwrap(), "done");

    // A task far exceeding its own deadline settles as a timeout and its
    // late result is discarded.
    let result = queue
        .submit("liar", Duration::from_millis(40), || async {
            tokio::time::sleep(Duration::from_secs(2)).await;
            "late"
        })
        .await;
    assert!(matches!(result, Err(QueueError::Timeout { .. })));
}

/// Stats drain back to zero once all submitted work settles.
#[tokio::test]
async fn test_queue_drains_clean() {
    let queue = FairQueue::new(4);

    let mut handles = Vec::new();
    for i in 0..16 {
        let queue = queue.clone();
        handles.push(tokio::spawn(async move {
            queue
                .submit(format!("owner-{}", i % 3), Duration::from_secs(10), || async {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                })
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let stats = queue.stats();
    assert_eq!(stats.pending, 0);
    assert_eq!(stats.active, 0);
    assert!(stats.active_by_owner.is_empty());
}
