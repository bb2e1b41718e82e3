//! `reqwest` implementation of the transport seam.

use std::error::Error as StdError;

use async_trait::async_trait;
use childkeys_core::{HttpTransport, KeyFetchError, KeyFetchResult, RawResponse, Target, TransportError};

use crate::timeout::TimeoutConfig;

/// HTTP transport backed by a pooled `reqwest::Client`.
///
/// Cloning is cheap and shares the connection pool, so one instance can be
/// handed to many concurrent fetches as their `agent`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    timeouts: TimeoutConfig,
}

impl ReqwestTransport {
    /// Create a transport with its own connection pool.
    pub fn new(timeouts: TimeoutConfig) -> KeyFetchResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeouts.connect)
            .user_agent(concat!("childkeys/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(client_build_error)?;
        Ok(Self { client, timeouts })
    }

    fn classify(&self, error: reqwest::Error, target: &Target) -> TransportError {
        // The URL carries the credential; keep it out of error text.
        let error = error.without_url();
        if error.is_timeout() {
            TransportError::Timeout(self.timeouts.effective(target.timeout()))
        } else if error.is_builder() {
            TransportError::Request(error_chain(&error))
        } else {
            TransportError::Connection(error_chain(&error))
        }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, target: &Target) -> Result<RawResponse, TransportError> {
        let response = self
            .client
            .get(target.url())
            .timeout(self.timeouts.effective(target.timeout()))
            .send()
            .await
            .map_err(|e| self.classify(e, target))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| self.classify(e, target))?;

        Ok(RawResponse::new(status, body.to_vec()))
    }
}

/// Client construction failure, raised before any request.
fn client_build_error(error: reqwest::Error) -> KeyFetchError {
    KeyFetchError::invalid(format!("HTTP client build failed: {}", error_chain(&error)))
}

fn error_chain(error: &dyn StdError) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use childkeys_core::NodeReference;

    use super::*;

    fn builder_error() -> reqwest::Error {
        reqwest::Client::new().get("not a url").build().unwrap_err()
    }

    #[test]
    fn test_client_build_failure_is_invalid_argument() {
        let err = client_build_error(builder_error());
        assert_eq!(err.kind(), "invalid_argument");
        assert!(err.to_string().contains("HTTP client build failed"));
    }

    #[test]
    fn test_builder_error_not_retryable() {
        let transport = ReqwestTransport::new(TimeoutConfig::default()).unwrap();
        let reference = NodeReference::parse("https://db.example.com/a").unwrap();
        let target = Target::shallow(&reference, None).unwrap();

        let error = transport.classify(builder_error(), &target);
        assert!(matches!(error, TransportError::Request(_)));
        assert!(!error.is_retryable());
    }
}
