//! Credentials attached to REST reads.

use std::fmt;

use async_trait::async_trait;

use crate::error::{KeyFetchError, KeyFetchResult};

/// Query parameter carrying an access token.
pub const ACCESS_TOKEN_PARAM: &str = "access_token";
/// Query parameter carrying a legacy database secret or custom token.
pub const LEGACY_AUTH_PARAM: &str = "auth";

/// Proof of identity for the REST endpoint.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// OAuth-style access token, sent as `access_token`.
    AccessToken(String),
    /// Legacy secret or ID token, sent as `auth`.
    Legacy(String),
}

impl Credential {
    /// Query parameter name for this credential.
    pub fn param_name(&self) -> &'static str {
        match self {
            Self::AccessToken(_) => ACCESS_TOKEN_PARAM,
            Self::Legacy(_) => LEGACY_AUTH_PARAM,
        }
    }

    /// Raw credential value.
    pub fn value(&self) -> &str {
        match self {
            Self::AccessToken(v) | Self::Legacy(v) => v,
        }
    }

    /// Reject blank credentials.
    pub fn validate(&self) -> KeyFetchResult<()> {
        if self.value().trim().is_empty() {
            return Err(KeyFetchError::invalid(format!(
                "{} must not be empty",
                self.param_name()
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AccessToken(_) => f.write_str("AccessToken(***)"),
            Self::Legacy(_) => f.write_str("Legacy(***)"),
        }
    }
}

/// Source of credentials associated with a node reference.
///
/// Consulted at most once per fetch, before the first attempt.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Current credential, or `None` for an unauthenticated read.
    async fn credential(&self) -> KeyFetchResult<Option<Credential>>;
}

/// Provider that always hands out the same credential.
#[derive(Debug, Clone)]
pub struct StaticCredentials {
    credential: Option<Credential>,
}

impl StaticCredentials {
    /// Provider for an access token.
    pub fn access_token(token: impl Into<String>) -> Self {
        Self {
            credential: Some(Credential::AccessToken(token.into())),
        }
    }

    /// Provider for a legacy secret.
    pub fn legacy(secret: impl Into<String>) -> Self {
        Self {
            credential: Some(Credential::Legacy(secret.into())),
        }
    }

    /// Provider for unauthenticated reads.
    pub fn anonymous() -> Self {
        Self { credential: None }
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentials {
    async fn credential(&self) -> KeyFetchResult<Option<Credential>> {
        Ok(self.credential.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_names() {
        assert_eq!(Credential::AccessToken("t".into()).param_name(), "access_token");
        assert_eq!(Credential::Legacy("s".into()).param_name(), "auth");
    }

    #[test]
    fn test_debug_redacts_value() {
        let cred = Credential::AccessToken("ya29.secret".into());
        assert!(!format!("{:?}", cred).contains("secret"));
    }

    #[test]
    fn test_blank_credential_rejected() {
        assert!(Credential::Legacy("  ".into()).validate().is_err());
        assert!(Credential::Legacy("abc".into()).validate().is_ok());
    }

    #[tokio::test]
    async fn test_static_provider() {
        let provider = StaticCredentials::access_token("abc");
        assert_eq!(
            provider.credential().await.unwrap(),
            Some(Credential::AccessToken("abc".into()))
        );
        assert_eq!(StaticCredentials::anonymous().credential().await.unwrap(), None);
    }
}
