//! The child-key fetch pipeline: resolve, attempt with retry, extract.

use std::sync::Arc;

use childkeys_core::{
    is_retryable_status, resolve_target, FetchOptions, HttpTransport, KeyFetchError,
    KeyFetchResult, KeyList, NodeReference, RawResponse, Target, TransportError,
};
use childkeys_observability::{FetchMetrics, MetricsCollector};
use tracing::{debug, warn};

use crate::extract::{error_payload, extract_keys};
use crate::http::ReqwestTransport;
use crate::retry::{AttemptState, RetryPolicy};
use crate::timeout::TimeoutConfig;

/// Longest body excerpt kept in a status error.
const MAX_ERROR_BODY: usize = 256;

/// Result of a fetch together with its metrics.
#[derive(Debug)]
pub struct FetchReport {
    /// Keys, or the error that ended the fetch.
    pub result: KeyFetchResult<KeyList>,
    /// Attempt timings and outcome.
    pub metrics: FetchMetrics,
}

impl FetchReport {
    /// Drop the metrics.
    pub fn into_result(self) -> KeyFetchResult<KeyList> {
        self.result
    }
}

/// Fetches the immediate child keys of store nodes.
///
/// Holds no per-call state; one instance can serve any number of
/// concurrent fetches.
#[derive(Debug, Clone)]
pub struct KeyFetcher {
    transport: Arc<dyn HttpTransport>,
}

impl KeyFetcher {
    /// Fetcher over a fresh `ReqwestTransport` with default timeouts.
    pub fn new() -> KeyFetchResult<Self> {
        Self::with_timeouts(TimeoutConfig::default())
    }

    /// Fetcher over a fresh `ReqwestTransport`.
    pub fn with_timeouts(timeouts: TimeoutConfig) -> KeyFetchResult<Self> {
        Ok(Self::with_transport(Arc::new(ReqwestTransport::new(timeouts)?)))
    }

    /// Fetcher over any transport.
    pub fn with_transport(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }

    /// Fetch the child keys of `reference`.
    pub async fn fetch_child_keys(
        &self,
        reference: &NodeReference,
        options: &FetchOptions,
    ) -> KeyFetchResult<KeyList> {
        self.fetch_with_metrics(reference, options).await.into_result()
    }

    /// Fetch the child keys of `reference` and report how it went.
    pub async fn fetch_with_metrics(
        &self,
        reference: &NodeReference,
        options: &FetchOptions,
    ) -> FetchReport {
        let target = match resolve_target(reference, options).await {
            Ok(target) => target,
            Err(error) => {
                debug!(node = %reference, error = %error, "rejected before any request");
                let metrics = MetricsCollector::new(reference.to_string()).finish_failure(&error);
                return FetchReport {
                    result: Err(error),
                    metrics,
                };
            }
        };

        let transport = options.agent.as_ref().unwrap_or(&self.transport);
        let policy = RetryPolicy::from_options(options);
        let mut metrics = MetricsCollector::new(target.redacted());

        let result = run_attempts(transport.as_ref(), &target, policy, &mut metrics).await;
        let metrics = match &result {
            Ok(keys) => metrics.finish_success(keys.len()),
            Err(error) => metrics.finish_failure(error),
        };

        match &result {
            Ok(keys) => debug!(
                url = %metrics.url,
                keys = keys.len(),
                attempts = metrics.attempt_count(),
                elapsed_us = metrics.total_duration_us,
                "fetched child keys"
            ),
            Err(error) => warn!(
                url = %metrics.url,
                kind = error.kind(),
                attempts = metrics.attempt_count(),
                error = %error,
                "child key fetch failed"
            ),
        }

        FetchReport { result, metrics }
    }
}

/// Fetch child keys with a one-off fetcher.
///
/// Uses `options.agent` when set, otherwise a new `ReqwestTransport` sized by
/// `options.timeout_ms`. Prefer a long-lived `KeyFetcher` for repeated calls.
pub async fn fetch_child_keys(
    reference: &NodeReference,
    options: &FetchOptions,
) -> KeyFetchResult<KeyList> {
    options.validate()?;
    let fetcher = match &options.agent {
        Some(agent) => KeyFetcher::with_transport(agent.clone()),
        None => {
            let timeouts = options
                .timeout()
                .map(TimeoutConfig::from_total)
                .unwrap_or_default();
            KeyFetcher::with_timeouts(timeouts)?
        }
    };
    fetcher.fetch_child_keys(reference, options).await
}

/// What one attempt produced.
enum Attempt {
    Done(KeyFetchResult<KeyList>),
    Failed(TransportError),
}

async fn run_attempts(
    transport: &dyn HttpTransport,
    target: &Target,
    policy: RetryPolicy,
    metrics: &mut MetricsCollector,
) -> KeyFetchResult<KeyList> {
    let mut state = AttemptState::Idle;

    loop {
        state = state.begin_attempt();
        let attempt = state.attempts();
        debug!(
            url = %target.redacted(),
            attempt,
            max_tries = policy.max_tries,
            "requesting child keys"
        );

        metrics.attempt_started(attempt);
        let outcome = match transport.get(target).await {
            Ok(response) => {
                metrics.attempt_finished(Some(response.status), Some(response.len()), None);
                classify_response(&response)
            }
            Err(error) => {
                metrics.attempt_finished(None, None, Some(error.to_string()));
                Attempt::Failed(error)
            }
        };

        match outcome {
            Attempt::Done(result) => {
                state = if result.is_ok() {
                    AttemptState::Success(attempt)
                } else {
                    AttemptState::Failed(attempt)
                };
                debug!(%state, "attempt finished");
                return result;
            }
            Attempt::Failed(error) if policy.should_retry(&error, attempt) => {
                state = AttemptState::Waiting(attempt);
                warn!(
                    attempt,
                    max_tries = policy.max_tries,
                    delay_ms = policy.delay().as_millis() as u64,
                    error = %error,
                    "transient failure, retrying"
                );
                metrics.record_wait(policy.delay());
                tokio::time::sleep(policy.delay()).await;
            }
            Attempt::Failed(error) => {
                state = AttemptState::Failed(attempt);
                debug!(%state, "attempt finished");
                return Err(KeyFetchError::Transport {
                    attempts: attempt,
                    source: error,
                });
            }
        }
    }
}

/// Sort a response into keys, a terminal error or a transport failure.
///
/// Retryable statuses are transport failures even when the body carries an
/// error payload.
fn classify_response(response: &RawResponse) -> Attempt {
    if response.is_success() {
        return Attempt::Done(response.text().and_then(extract_keys));
    }

    let body = String::from_utf8_lossy(&response.body);
    let error = TransportError::Status {
        status: response.status,
        body: excerpt(&body),
    };
    if is_retryable_status(response.status) {
        return Attempt::Failed(error);
    }

    match error_payload(&body) {
        Some(message) => Attempt::Done(Err(KeyFetchError::from_remote_message(message))),
        None => Attempt::Done(Err(KeyFetchError::Remote(error.to_string()))),
    }
}

fn excerpt(body: &str) -> String {
    let body = body.trim();
    match body.char_indices().nth(MAX_ERROR_BODY) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}
