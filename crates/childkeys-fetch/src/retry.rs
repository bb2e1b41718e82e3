//! Bounded retry for transient transport failures.

use std::fmt;
use std::time::Duration;

use childkeys_core::{FetchOptions, TransportError};

/// Retry policy for one fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first.
    pub max_tries: u32,
    /// Fixed delay between attempts.
    pub interval: Duration,
}

impl RetryPolicy {
    /// Create a new retry policy.
    pub fn new(max_tries: u32, interval: Duration) -> Self {
        Self {
            max_tries: max_tries.max(1),
            interval,
        }
    }

    /// Policy described by fetch options.
    pub fn from_options(options: &FetchOptions) -> Self {
        Self::new(options.max_tries, options.retry_interval())
    }

    /// Whether `error`, raised by attempt number `attempt` (1-based), earns another try.
    pub fn should_retry(&self, error: &TransportError, attempt: u32) -> bool {
        attempt < self.max_tries && error.is_retryable()
    }

    /// Delay before the next attempt.
    pub fn delay(&self) -> Duration {
        self.interval
    }
}

/// Where a fetch stands.
///
/// `Idle -> Attempting -> {Success, Waiting, Failed}`, and
/// `Waiting -> Attempting` once the delay has elapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    Idle,
    Attempting(u32),
    Waiting(u32),
    Success(u32),
    Failed(u32),
}

impl AttemptState {
    /// Attempts started so far.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Idle => 0,
            Self::Attempting(n) | Self::Waiting(n) | Self::Success(n) | Self::Failed(n) => *n,
        }
    }

    /// Move to the next attempt. Only valid from `Idle` or `Waiting`.
    pub fn begin_attempt(self) -> Self {
        match self {
            Self::Idle => Self::Attempting(1),
            Self::Waiting(n) => Self::Attempting(n + 1),
            other => other,
        }
    }
}

impl fmt::Display for AttemptState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Attempting(n) => write!(f, "attempting #{n}"),
            Self::Waiting(n) => write!(f, "waiting after #{n}"),
            Self::Success(n) => write!(f, "succeeded on #{n}"),
            Self::Failed(n) => write!(f, "failed on #{n}"),
        }
    }
}
