//! Handles to locations in the hierarchical store.

use std::fmt;
use std::sync::Arc;

use url::Url;

use crate::credentials::CredentialProvider;
use crate::error::{KeyFetchError, KeyFetchResult};

/// Characters the store forbids inside a key.
const FORBIDDEN_KEY_CHARS: [char; 5] = ['.', '$', '#', '[', ']'];

/// A node location in the store, e.g. `https://my-db.example.com/users/alice`.
#[derive(Clone)]
pub struct NodeReference {
    base: Url,
    segments: Vec<String>,
    credentials: Option<Arc<dyn CredentialProvider>>,
}

impl NodeReference {
    /// Parse a node URL.
    ///
    /// The URL must be `http` or `https`, carry a host and have neither a
    /// query nor a fragment. Path segments are checked against the store's
    /// key rules.
    pub fn parse(input: &str) -> KeyFetchResult<Self> {
        let url = Url::parse(input.trim())
            .map_err(|e| KeyFetchError::invalid(format!("invalid node URL {input:?}: {e}")))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(KeyFetchError::invalid(format!(
                "unsupported scheme {:?} in {input:?}",
                url.scheme()
            )));
        }
        if url.host_str().map_or(true, str::is_empty) {
            return Err(KeyFetchError::invalid(format!("missing host in {input:?}")));
        }
        if url.query().is_some() || url.fragment().is_some() {
            return Err(KeyFetchError::invalid(format!(
                "node URL must not carry a query or fragment: {input:?}"
            )));
        }

        let mut base = url.clone();
        base.set_path("/");

        let mut reference = Self {
            base,
            segments: Vec::new(),
            credentials: None,
        };
        reference.push_path(url.path())?;
        Ok(reference)
    }

    /// Reference to a descendant; `path` may contain several `/`-separated keys.
    pub fn child(&self, path: &str) -> KeyFetchResult<Self> {
        let mut child = self.clone();
        child.push_path(path)?;
        Ok(child)
    }

    /// Reference to the parent, or `None` at the root.
    pub fn parent(&self) -> Option<Self> {
        if self.segments.is_empty() {
            return None;
        }
        let mut parent = self.clone();
        parent.segments.pop();
        Some(parent)
    }

    /// Reference to the root of the same store.
    pub fn root(&self) -> Self {
        Self {
            base: self.base.clone(),
            segments: Vec::new(),
            credentials: self.credentials.clone(),
        }
    }

    /// Last key of the path, `None` at the root.
    pub fn key(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Path from the root, always starting with `/`.
    pub fn path(&self) -> String {
        format!("/{}", self.segments.join("/"))
    }

    /// Attach an ambient credential source.
    pub fn with_credentials(mut self, provider: Arc<dyn CredentialProvider>) -> Self {
        self.credentials = Some(provider);
        self
    }

    /// Credential source attached to this reference.
    pub fn credentials(&self) -> Option<&Arc<dyn CredentialProvider>> {
        self.credentials.as_ref()
    }

    fn push_path(&mut self, path: &str) -> KeyFetchResult<()> {
        for raw in path.split('/').filter(|s| !s.is_empty()) {
            let segment = percent_decode(raw)?;
            validate_key(&segment)?;
            self.segments.push(segment);
        }
        Ok(())
    }
}

impl fmt::Display for NodeReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.clear();
            path.extend(self.segments.iter());
        }
        let rendered = url.as_str();
        if self.segments.is_empty() {
            f.write_str(rendered.trim_end_matches('/'))
        } else {
            f.write_str(rendered)
        }
    }
}

impl fmt::Debug for NodeReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeReference")
            .field("url", &self.to_string())
            .field("has_credentials", &self.credentials.is_some())
            .finish()
    }
}

impl PartialEq for NodeReference {
    fn eq(&self, other: &Self) -> bool {
        self.base == other.base && self.segments == other.segments
    }
}

impl Eq for NodeReference {}

/// Check a single key against the store's naming rules.
pub fn validate_key(key: &str) -> KeyFetchResult<()> {
    if key.is_empty() {
        return Err(KeyFetchError::invalid("empty key in node path"));
    }
    if let Some(c) = key
        .chars()
        .find(|c| FORBIDDEN_KEY_CHARS.contains(c) || c.is_control())
    {
        return Err(KeyFetchError::invalid(format!(
            "key {key:?} contains forbidden character {c:?}"
        )));
    }
    Ok(())
}

fn percent_decode(raw: &str) -> KeyFetchResult<String> {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes
                .get(i + 1..i + 3)
                .filter(|h| h.iter().all(u8::is_ascii_hexdigit))
                .and_then(|h| std::str::from_utf8(h).ok())
                .and_then(|h| u8::from_str_radix(h, 16).ok())
                .ok_or_else(|| KeyFetchError::invalid(format!("bad percent escape in {raw:?}")))?;
            out.push(hex);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out)
        .map_err(|_| KeyFetchError::invalid(format!("path segment {raw:?} is not UTF-8")))
}
