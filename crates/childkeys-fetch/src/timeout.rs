//! Timeout configuration for the default transport.

use std::time::Duration;

/// Timeouts applied by `ReqwestTransport`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutConfig {
    /// Connection establishment timeout.
    pub connect: Duration,
    /// Whole-attempt timeout, unless the target carries its own.
    pub total: Duration,
}

impl TimeoutConfig {
    /// Create from a single total timeout.
    pub fn from_total(total: Duration) -> Self {
        Self {
            connect: std::cmp::min(total, Duration::from_secs(10)),
            total,
        }
    }

    /// Timeout for one attempt, honouring a per-call override.
    pub fn effective(&self, per_call: Option<Duration>) -> Duration {
        per_call.unwrap_or(self.total)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(10),
            total: Duration::from_secs(30),
        }
    }
}
