//! HTTP transport seam.

use std::fmt;

use async_trait::async_trait;

use crate::error::{KeyFetchError, KeyFetchResult, TransportError};
use crate::target::Target;

/// Status and body of one HTTP response.
///
/// The body is handed on byte for byte; it is never deserialized as a whole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body as received.
    pub body: Vec<u8>,
}

impl RawResponse {
    /// Create a new response.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Shorthand for a `200 OK` response.
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self::new(200, body)
    }

    /// Body as text. Invalid UTF-8 is a parse error; nothing is replaced.
    pub fn text(&self) -> KeyFetchResult<&str> {
        std::str::from_utf8(&self.body)
            .map_err(|e| KeyFetchError::parse(e.valid_up_to(), "body is not valid UTF-8"))
    }

    /// Body size in bytes.
    pub fn len(&self) -> usize {
        self.body.len()
    }

    /// True for an empty body.
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// Check if the response was successful (2xx status).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Check if the response was a client error (4xx status).
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    /// Check if the response was a server error (5xx status).
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }
}

/// Performs one HTTP GET per call and returns the raw text body.
///
/// Implementations must not retry on their own; each call is one round trip.
#[async_trait]
pub trait HttpTransport: Send + Sync + fmt::Debug {
    /// Issue a GET for `target`.
    async fn get(&self, target: &Target) -> Result<RawResponse, TransportError>;
}
