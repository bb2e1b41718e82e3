//! Per-call fetch configuration.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::credentials::Credential;
use crate::error::{KeyFetchError, KeyFetchResult};
use crate::transport::HttpTransport;

/// Default number of attempts (no retry).
pub const DEFAULT_MAX_TRIES: u32 = 1;
/// Default delay between attempts.
pub const DEFAULT_RETRY_INTERVAL_MS: u64 = 1000;

/// Options for one child-key fetch.
#[derive(Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FetchOptions {
    /// Maximum number of attempts, at least 1.
    #[serde(default = "default_max_tries")]
    pub max_tries: u32,

    /// Delay between attempts in milliseconds.
    #[serde(default = "default_retry_interval_ms")]
    pub retry_interval_ms: u64,

    /// Access token sent as `access_token`.
    #[serde(default, skip_serializing)]
    pub access_token: Option<String>,

    /// Legacy secret sent as `auth`.
    #[serde(default, skip_serializing)]
    pub auth: Option<String>,

    /// Per-attempt timeout in milliseconds for the default transport.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,

    /// Shared transport (connection pool) to use instead of the fetcher's own.
    #[serde(skip)]
    pub agent: Option<Arc<dyn HttpTransport>>,
}

fn default_max_tries() -> u32 {
    DEFAULT_MAX_TRIES
}

fn default_retry_interval_ms() -> u64 {
    DEFAULT_RETRY_INTERVAL_MS
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            max_tries: DEFAULT_MAX_TRIES,
            retry_interval_ms: DEFAULT_RETRY_INTERVAL_MS,
            access_token: None,
            auth: None,
            timeout_ms: None,
            agent: None,
        }
    }
}

impl FetchOptions {
    /// Options with all defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse options from a JSON value, mapping failures to `InvalidArgument`.
    pub fn from_json(value: serde_json::Value) -> KeyFetchResult<Self> {
        let options: Self = serde_json::from_value(value)
            .map_err(|e| KeyFetchError::invalid(format!("invalid fetch options: {e}")))?;
        options.validate()?;
        Ok(options)
    }

    /// Set the maximum number of attempts.
    pub fn with_max_tries(mut self, max_tries: u32) -> Self {
        self.max_tries = max_tries;
        self
    }

    /// Set the delay between attempts.
    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Authenticate with an access token.
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Authenticate with a legacy secret.
    pub fn with_auth(mut self, secret: impl Into<String>) -> Self {
        self.auth = Some(secret.into());
        self
    }

    /// Set the per-attempt timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    /// Route requests through a shared transport.
    pub fn with_agent(mut self, agent: Arc<dyn HttpTransport>) -> Self {
        self.agent = Some(agent);
        self
    }

    /// Delay between attempts.
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    /// Per-attempt timeout, if set.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Credential given directly in the options.
    pub fn credential(&self) -> Option<Credential> {
        match (&self.access_token, &self.auth) {
            (Some(token), _) => Some(Credential::AccessToken(token.clone())),
            (None, Some(secret)) => Some(Credential::Legacy(secret.clone())),
            (None, None) => None,
        }
    }

    /// Check the options before any network activity.
    pub fn validate(&self) -> KeyFetchResult<()> {
        if self.max_tries == 0 {
            return Err(KeyFetchError::invalid("max_tries must be at least 1"));
        }
        if self.timeout_ms == Some(0) {
            return Err(KeyFetchError::invalid("timeout_ms must be at least 1"));
        }
        if self.access_token.is_some() && self.auth.is_some() {
            return Err(KeyFetchError::invalid(
                "access_token and auth are mutually exclusive",
            ));
        }
        if let Some(credential) = self.credential() {
            credential.validate()?;
        }
        Ok(())
    }
}

impl fmt::Debug for FetchOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchOptions")
            .field("max_tries", &self.max_tries)
            .field("retry_interval_ms", &self.retry_interval_ms)
            .field("credential", &self.credential())
            .field("timeout_ms", &self.timeout_ms)
            .field("agent", &self.agent.is_some())
            .finish()
    }
}
