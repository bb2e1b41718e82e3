//! Error taxonomy for child-key fetches.

use std::time::Duration;

use thiserror::Error;

/// Result type for child-key operations.
pub type KeyFetchResult<T> = Result<T, KeyFetchError>;

/// Failure of a single HTTP attempt.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// Could not reach the server.
    #[error("connection error: {0}")]
    Connection(String),

    /// The attempt did not complete in time.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The server answered with a non-2xx status and no error payload.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The request could not be built or sent.
    #[error("request error: {0}")]
    Request(String),
}

impl TransportError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connection(_) | Self::Timeout(_) => true,
            Self::Status { status, .. } => is_retryable_status(*status),
            Self::Request(_) => false,
        }
    }
}

/// Statuses worth retrying when no error payload accompanies them.
pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 429 | 500..=599)
}

/// Errors surfaced by a child-key fetch.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KeyFetchError {
    /// Malformed reference or options. Raised before any network activity.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Transport failure that persisted after the allowed attempts.
    #[error("transport failed after {attempts} attempt(s): {source}")]
    Transport {
        attempts: u32,
        #[source]
        source: TransportError,
    },

    /// The server rejected the read because of its access rules.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Any other error reported by the server.
    #[error("remote error: {0}")]
    Remote(String),

    /// Response body did not match any recognized shape.
    #[error("parse error at byte {offset}: {reason}")]
    Parse { offset: usize, reason: String },
}

impl KeyFetchError {
    /// Build an invalid-argument error.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Build a parse error at `offset`.
    pub fn parse(offset: usize, reason: impl Into<String>) -> Self {
        Self::Parse {
            offset,
            reason: reason.into(),
        }
    }

    /// Classify a server-reported error message.
    pub fn from_remote_message(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.to_ascii_lowercase().contains("permission denied") {
            Self::PermissionDenied(message)
        } else {
            Self::Remote(message)
        }
    }

    /// Check if this error came from the store's access rules.
    pub fn is_permission_error(&self) -> bool {
        matches!(self, Self::PermissionDenied(_))
    }

    /// Check if this is a transport failure.
    pub fn is_transport_error(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// Stable lower-case name for logs and machine-readable output.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "invalid_argument",
            Self::Transport { .. } => "transport",
            Self::PermissionDenied(_) => "permission_denied",
            Self::Remote(_) => "remote",
            Self::Parse { .. } => "parse",
        }
    }
}
