//! Caller-side deadline sizing.
//!
//! The queue enforces deadlines but does not choose them. Callers predict
//! the cost of their own work (number of sequential external calls times
//! the per-call pacing, padded by a safety factor) and pass the resulting
//! timeout to [`FairQueue::submit`].
//!
//! [`FairQueue::submit`]: super::FairQueue::submit

use std::time::Duration;

/// Default safety factor applied to the raw cost estimate.
pub const DEFAULT_SAFETY_FACTOR: f64 = 2.0;

/// Lower clamp for computed task timeouts.
pub const MIN_TASK_TIMEOUT: Duration = Duration::from_secs(5);

/// Upper clamp for computed task timeouts.
pub const MAX_TASK_TIMEOUT: Duration = Duration::from_secs(120);

/// Predicted cost of one unit of queue work.
///
/// # Example
///
/// ```ignore
/// // Three sequential catalog calls, paced at one per second,
/// // padded 2x and clamped to [5s, 120s]: 6 seconds.
/// let timeout = CostEstimate::new(3, Duration::from_millis(1_000)).timeout();
/// ```
#[derive(Debug, Clone, Copy)]
pub struct CostEstimate {
    /// Number of sequential external calls the work will make.
    pub calls: u32,
    /// Expected duration of one call, including pacing.
    pub per_call: Duration,
    /// Multiplier padding the raw estimate.
    pub safety_factor: f64,
}

impl CostEstimate {
    /// Creates an estimate with the default safety factor.
    pub fn new(calls: u32, per_call: Duration) -> Self {
        Self {
            calls,
            per_call,
            safety_factor: DEFAULT_SAFETY_FACTOR,
        }
    }

    /// Overrides the safety factor.
    pub fn with_safety_factor(mut self, factor: f64) -> Self {
        self.safety_factor = factor;
        self
    }

    /// Computes the timeout, clamped to the default range.
    pub fn timeout(&self) -> Duration {
        self.timeout_clamped(MIN_TASK_TIMEOUT, MAX_TASK_TIMEOUT)
    }

    /// Computes the timeout, clamped to `[min, max]`.
    pub fn timeout_clamped(&self, min: Duration, max: Duration) -> Duration {
        let raw = self.per_call.as_secs_f64() * self.calls as f64 * self.safety_factor;
        Duration::from_secs_f64(raw).clamp(min, max)
    }
}
