//! Per-call fetch metrics.

use std::time::{Duration, Instant};

use childkeys_core::KeyFetchError;
use serde::{Deserialize, Serialize};

/// Final state of a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchOutcome {
    Success,
    Failed,
}

/// Metrics for one HTTP attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptMetrics {
    /// Attempt number, starting at 1.
    pub attempt: u32,
    /// Round-trip duration (microseconds).
    pub duration_us: u64,
    /// HTTP status code, if a response arrived.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    /// Response size in bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_bytes: Option<usize>,
    /// Transport error, if the attempt failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Metrics for a whole child-key fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchMetrics {
    /// Request URL with credentials masked.
    pub url: String,
    /// One entry per HTTP round trip.
    pub attempts: Vec<AttemptMetrics>,
    /// Time spent waiting between attempts (milliseconds).
    pub waited_ms: u64,
    /// Total duration (microseconds).
    pub total_duration_us: u64,
    /// Final state.
    pub outcome: FetchOutcome,
    /// Number of keys returned on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_count: Option<usize>,
    /// Error kind on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
}

impl FetchMetrics {
    /// Number of HTTP round trips.
    pub fn attempt_count(&self) -> u32 {
        self.attempts.len() as u32
    }

    /// Whether more than one attempt was needed.
    pub fn retried(&self) -> bool {
        self.attempts.len() > 1
    }

    /// Format as JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| self.summary())
    }

    /// One-line human summary.
    pub fn summary(&self) -> String {
        let outcome = match (self.outcome, &self.error_kind) {
            (FetchOutcome::Success, _) => format!("{} keys", self.key_count.unwrap_or(0)),
            (FetchOutcome::Failed, Some(kind)) => format!("failed ({kind})"),
            (FetchOutcome::Failed, None) => "failed".to_string(),
        };
        format!(
            "{} | {} attempt(s), waited {}ms, {}us total | {}",
            self.url,
            self.attempt_count(),
            self.waited_ms,
            self.total_duration_us,
            outcome
        )
    }
}

/// Collector filled in while a fetch runs.
#[derive(Debug)]
pub struct MetricsCollector {
    url: String,
    start: Instant,
    current: Option<(u32, Instant)>,
    attempts: Vec<AttemptMetrics>,
    waited: Duration,
}

impl MetricsCollector {
    /// Start collecting for `url` (already redacted).
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            start: Instant::now(),
            current: None,
            attempts: Vec::new(),
            waited: Duration::ZERO,
        }
    }

    /// Record the start of attempt `attempt`.
    pub fn attempt_started(&mut self, attempt: u32) {
        self.current = Some((attempt, Instant::now()));
    }

    /// Record the end of the current attempt.
    pub fn attempt_finished(
        &mut self,
        status_code: Option<u16>,
        response_bytes: Option<usize>,
        error: Option<String>,
    ) {
        let (attempt, started) = self
            .current
            .take()
            .unwrap_or((self.attempts.len() as u32 + 1, Instant::now()));
        self.attempts.push(AttemptMetrics {
            attempt,
            duration_us: started.elapsed().as_micros() as u64,
            status_code,
            response_bytes,
            error,
        });
    }

    /// Record a wait between attempts.
    pub fn record_wait(&mut self, delay: Duration) {
        self.waited += delay;
    }

    /// Attempts recorded so far.
    pub fn attempt_count(&self) -> u32 {
        self.attempts.len() as u32
    }

    /// Close out a successful fetch.
    pub fn finish_success(self, key_count: usize) -> FetchMetrics {
        self.finish(FetchOutcome::Success, Some(key_count), None)
    }

    /// Close out a failed fetch.
    pub fn finish_failure(self, error: &KeyFetchError) -> FetchMetrics {
        self.finish(FetchOutcome::Failed, None, Some(error.kind().to_string()))
    }

    fn finish(
        self,
        outcome: FetchOutcome,
        key_count: Option<usize>,
        error_kind: Option<String>,
    ) -> FetchMetrics {
        FetchMetrics {
            url: self.url,
            attempts: self.attempts,
            waited_ms: self.waited.as_millis() as u64,
            total_duration_us: self.start.elapsed().as_micros() as u64,
            outcome,
            key_count,
            error_kind,
        }
    }
}
