//! Lists of child keys.

use std::collections::HashSet;

use serde::Serialize;

use crate::error::{KeyFetchError, KeyFetchResult};

/// Top-level keys of a node, in wire order.
///
/// Keys are kept exactly as encoded in the response body. A key holding a
/// quote arrives as `a\"b` and stays that way, so it can be sent back to the
/// store unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct KeyList(Vec<String>);

impl KeyList {
    /// Empty list.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when the node has no children.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Check for a key in its encoded form.
    pub fn contains(&self, key: &str) -> bool {
        self.0.iter().any(|k| k == key)
    }

    /// Iterate over the encoded keys.
    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }

    /// Keys sorted lexically.
    pub fn sorted(mut self) -> Self {
        self.0.sort();
        self
    }

    /// Unwrap into the underlying vector.
    pub fn into_vec(self) -> Vec<String> {
        self.0
    }

    /// Unescaped copies of the keys, for display.
    pub fn decoded(&self) -> KeyFetchResult<Vec<String>> {
        self.0.iter().map(|k| decode_key(k)).collect()
    }
}

impl FromIterator<String> for KeyList {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        let mut seen = HashSet::new();
        Self(
            iter.into_iter()
                .filter(|key| seen.insert(key.clone()))
                .collect(),
        )
    }
}

impl IntoIterator for KeyList {
    type Item = String;
    type IntoIter = std::vec::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a KeyList {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Unescape one wire-encoded key.
pub fn decode_key(encoded: &str) -> KeyFetchResult<String> {
    serde_json::from_str(&format!("\"{encoded}\""))
        .map_err(|e| KeyFetchError::parse(0, format!("bad escape in key {encoded:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_drops_duplicates() {
        let keys: KeyList = ["a", "b", "a"].into_iter().map(String::from).collect();
        assert_eq!(keys.into_vec(), vec!["a", "b"]);
    }

    #[test]
    fn test_sorted() {
        let keys: KeyList = ["b", "c", "a"].into_iter().map(String::from).collect();
        assert_eq!(keys.sorted().into_vec(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_decoded() {
        let keys: KeyList = [r#"say \"hi\""#, r"caf\u00e9", "plain"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(
            keys.decoded().unwrap(),
            vec!["say \"hi\"".to_string(), "café".to_string(), "plain".to_string()]
        );
        assert!(keys.contains(r"caf\u00e9"));
        assert!(!keys.contains("café"));
    }

    #[test]
    fn test_decode_rejects_bad_escape() {
        assert!(decode_key(r"\x41").is_err());
    }

    #[test]
    fn test_serializes_as_array() {
        let keys: KeyList = ["one", "two"].into_iter().map(String::from).collect();
        assert_eq!(serde_json::to_string(&keys).unwrap(), r#"["one","two"]"#);
    }
}
