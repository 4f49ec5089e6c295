//! Retry policy for registry pushes.

use std::time::Duration;

/// Push retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 4;

/// Fixed wait between push attempts.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(90);

/// Bounded, fixed-interval retry with no jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            interval: DEFAULT_RETRY_INTERVAL,
        }
    }
}

impl RetryPolicy {
    /// Policy with `max_retries` retries spaced `interval_secs` apart.
    pub fn new(max_retries: u32, interval_secs: u64) -> Self {
        Self {
            max_retries,
            interval: Duration::from_secs(interval_secs),
        }
    }

    /// Total pushes allowed, first attempt included.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Whether another push may follow attempt number `attempt` (1-based).
    pub fn allows_retry_after(&self, attempt: u32) -> bool {
        attempt < self.max_attempts()
    }
}

/// Outcome of a single push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Succeeded,
    Failed(String),
}

/// One push of one target, kept for the publish report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishAttempt {
    pub target: String,
    pub version: String,
    pub attempt_number: u32,
    pub outcome: AttemptOutcome,
}

impl PublishAttempt {
    pub fn succeeded(&self) -> bool {
        self.outcome == AttemptOutcome::Succeeded
    }
}
