use std::time::Duration;
use tokio::time::Instant;

/// Retry deadline for retryable check failures.
///
/// Without a deadline the first retryable failure is fatal. The sleep between
/// attempts is fixed; there is no backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    deadline: Option<Instant>,
    interval: Duration,
}

impl RetryPolicy {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

    /// Fail on the first retryable outcome.
    pub fn no_retry() -> Self {
        Self {
            deadline: None,
            interval: Self::DEFAULT_INTERVAL,
        }
    }

    /// Retry until an absolute point in time.
    pub fn until(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            interval: Self::DEFAULT_INTERVAL,
        }
    }

    /// Retry for `window` from now. A zero window means no retries.
    pub fn wait_for(window: Duration) -> Self {
        if window.is_zero() {
            Self::no_retry()
        } else {
            Self::until(Instant::now() + window)
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Drop the deadline, keeping the interval.
    pub fn without_deadline(mut self) -> Self {
        self.deadline = None;
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn allows_retry_at(&self, now: Instant) -> bool {
        self.deadline.map_or(false, |deadline| now < deadline)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::no_retry()
    }
}
