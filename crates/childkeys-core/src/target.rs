//! Resolution of a node reference into a shallow REST request.

use std::time::Duration;

use url::Url;

use crate::credentials::Credential;
use crate::error::{KeyFetchError, KeyFetchResult};
use crate::options::FetchOptions;
use crate::reference::NodeReference;

/// Suffix marking a REST data request.
pub const REST_SUFFIX: &str = ".json";
/// Query parameter forcing a shallow read.
pub const SHALLOW_PARAM: &str = "shallow";

/// A resolved REST request: endpoint plus query parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    endpoint: Url,
    query: Vec<(&'static str, String)>,
    credential: Option<Credential>,
    timeout: Option<Duration>,
}

impl Target {
    /// Build the shallow-read target for `reference` with an optional credential.
    pub fn shallow(reference: &NodeReference, credential: Option<Credential>) -> KeyFetchResult<Self> {
        let location = reference.to_string();
        let uri = if reference.key().is_none() {
            format!("{location}/{REST_SUFFIX}")
        } else {
            format!("{location}{REST_SUFFIX}")
        };
        let endpoint = Url::parse(&uri)
            .map_err(|e| KeyFetchError::invalid(format!("cannot build endpoint {uri:?}: {e}")))?;

        if let Some(credential) = &credential {
            credential.validate()?;
        }

        Ok(Self {
            endpoint,
            query: vec![(SHALLOW_PARAM, "true".to_string())],
            credential,
            timeout: None,
        })
    }

    /// Limit each attempt against this target to `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Per-attempt timeout, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Endpoint without query parameters.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// All query parameters, credential included.
    pub fn query(&self) -> Vec<(&'static str, &str)> {
        let mut params: Vec<(&'static str, &str)> =
            self.query.iter().map(|(k, v)| (*k, v.as_str())).collect();
        if let Some(credential) = &self.credential {
            params.push((credential.param_name(), credential.value()));
        }
        params
    }

    /// Whether a credential is attached.
    pub fn is_authenticated(&self) -> bool {
        self.credential.is_some()
    }

    /// Full request URL with percent-encoded query.
    pub fn url(&self) -> Url {
        self.render(false)
    }

    /// Request URL with credential values masked, for logs.
    pub fn redacted(&self) -> String {
        self.render(true).to_string()
    }

    fn render(&self, redact: bool) -> Url {
        let mut url = self.endpoint.clone();
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &self.query {
                pairs.append_pair(key, value);
            }
            if let Some(credential) = &self.credential {
                let value = if redact { "***" } else { credential.value() };
                pairs.append_pair(credential.param_name(), value);
            }
        }
        url
    }
}

/// Resolve the request target for one fetch.
///
/// Credentials in `options` take precedence over the provider attached to
/// `reference`; the provider is consulted at most once.
pub async fn resolve_target(reference: &NodeReference, options: &FetchOptions) -> KeyFetchResult<Target> {
    options.validate()?;

    let credential = match options.credential() {
        Some(credential) => Some(credential),
        None => match reference.credentials() {
            Some(provider) => provider.credential().await?,
            None => None,
        },
    };

    Ok(Target::shallow(reference, credential)?.with_timeout(options.timeout()))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::credentials::{CredentialProvider, StaticCredentials};

    #[derive(Default)]
    struct CountingProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CredentialProvider for CountingProvider {
        async fn credential(&self) -> KeyFetchResult<Option<Credential>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Some(Credential::AccessToken("from-provider".into())))
        }
    }

    fn node(url: &str) -> NodeReference {
        NodeReference::parse(url).unwrap()
    }

    #[tokio::test]
    async fn test_shallow_flag_always_present() {
        let target = resolve_target(&node("https://db.example.com/childrenKeys"), &FetchOptions::default())
            .await
            .unwrap();
        assert_eq!(target.endpoint().as_str(), "https://db.example.com/childrenKeys.json");
        assert_eq!(target.query(), vec![("shallow", "true")]);
        assert_eq!(
            target.url().as_str(),
            "https://db.example.com/childrenKeys.json?shallow=true"
        );
        assert!(!target.is_authenticated());
        assert_eq!(target.timeout(), None);
    }

    #[tokio::test]
    async fn test_timeout_carried() {
        let options = FetchOptions::new().with_timeout(Duration::from_millis(250));
        let target = resolve_target(&node("https://db.example.com/x"), &options).await.unwrap();
        assert_eq!(target.timeout(), Some(Duration::from_millis(250)));
    }

    #[tokio::test]
    async fn test_root_endpoint() {
        let target = resolve_target(&node("https://db.example.com/"), &FetchOptions::default())
            .await
            .unwrap();
        assert_eq!(target.endpoint().as_str(), "https://db.example.com/.json");
    }

    #[tokio::test]
    async fn test_access_token_attached_and_encoded() {
        let options = FetchOptions::new().with_access_token("a b&c");
        let target = resolve_target(&node("https://db.example.com/x"), &options).await.unwrap();
        assert_eq!(
            target.url().as_str(),
            "https://db.example.com/x.json?shallow=true&access_token=a+b%26c"
        );
        assert_eq!(
            target.redacted(),
            "https://db.example.com/x.json?shallow=true&access_token=***"
        );
    }

    #[tokio::test]
    async fn test_legacy_auth_param() {
        let options = FetchOptions::new().with_auth("secret");
        let target = resolve_target(&node("https://db.example.com/x"), &options).await.unwrap();
        assert!(target.query().contains(&("auth", "secret")));
    }

    #[tokio::test]
    async fn test_provider_consulted_once() {
        let provider = Arc::new(CountingProvider::default());
        let reference = node("https://db.example.com/x").with_credentials(provider.clone());
        let target = resolve_target(&reference, &FetchOptions::default()).await.unwrap();
        assert!(target.query().contains(&("access_token", "from-provider")));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_options_credential_beats_provider() {
        let provider = Arc::new(CountingProvider::default());
        let reference = node("https://db.example.com/x").with_credentials(provider.clone());
        let options = FetchOptions::new().with_access_token("explicit");
        let target = resolve_target(&reference, &options).await.unwrap();
        assert!(target.query().contains(&("access_token", "explicit")));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_blank_provider_credential_rejected() {
        let reference = node("https://db.example.com/x")
            .with_credentials(Arc::new(StaticCredentials::access_token(" ")));
        let err = resolve_target(&reference, &FetchOptions::default()).await.unwrap_err();
        assert!(matches!(err, KeyFetchError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_invalid_options_rejected() {
        let options = FetchOptions::new().with_max_tries(0);
        let err = resolve_target(&node("https://db.example.com/x"), &options).await.unwrap_err();
        assert!(matches!(err, KeyFetchError::InvalidArgument(_)));
    }
}
