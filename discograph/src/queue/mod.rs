//! Fair request queue.
//!
//! Admits units of async work from many owners onto a shared, fixed-size
//! concurrency budget, favoring owners with fewer currently-active tasks,
//! and enforcing a per-task deadline counted from enqueue.
//!
//! Deadline sizing is a caller-side policy: callers build a [`CostEstimate`]
//! from the predicted cost of their own work and pass the resulting timeout
//! to [`FairQueue::submit`]. The queue itself knows nothing about request
//! shapes.
//!
//! # Example
//!
//! ```ignore
//! use discograph::queue::{FairQueue, CostEstimate};
//!
//! let queue = FairQueue::new(8);
//! let timeout = CostEstimate::new(3, Duration::from_millis(1_000)).timeout();
//!
//! let result = queue
//!     .submit("session-42", timeout, || async { expensive_lookup().await })
//!     .await?;
//! ```

mod cost;
mod scheduler;
mod task;

pub use cost::{
    CostEstimate, DEFAULT_SAFETY_FACTOR, MAX_TASK_TIMEOUT, MIN_TASK_TIMEOUT,
};
pub use scheduler::{FairQueue, QueueStats};
pub use task::{OwnerId, QueueError};
