//! Key extraction from shallow-read bodies.
//!
//! The body is scanned, not deserialized. Top-level field names are sliced
//! straight out of the text, escapes and all, so a key comes back in exactly
//! the form the store sent it and can be used in a follow-up request without
//! a decode/encode round trip. Values are only checked for balanced brackets
//! and well-formed strings, so a full (non-shallow) body with deep nesting is
//! walked once without building any tree.

use childkeys_core::{KeyFetchError, KeyFetchResult, KeyList};

/// Recover the top-level keys from a response body.
///
/// - `null` or a leaf value (string, number, boolean) yields an empty list.
/// - `{"error": "..."}` fails with `PermissionDenied` or `Remote`.
/// - any other object yields its field names, still escaped.
/// - anything else, arrays included, is a `Parse` error.
pub fn extract_keys(body: &str) -> KeyFetchResult<KeyList> {
    match scan_body(body)? {
        Body::Leaf => Ok(KeyList::new()),
        Body::Object(entries) => {
            if let Some(message) = error_message(&entries)? {
                return Err(KeyFetchError::from_remote_message(message));
            }
            Ok(entries.into_iter().map(|e| e.key.to_string()).collect())
        }
    }
}

/// Message carried by an error payload, if `body` is one.
///
/// Anything that does not scan as an error payload yields `None`.
pub fn error_payload(body: &str) -> Option<String> {
    match scan_body(body).ok()? {
        Body::Object(entries) => error_message(&entries).ok().flatten(),
        Body::Leaf => None,
    }
}

#[derive(Debug)]
enum Body<'a> {
    /// `null` or a scalar: no children.
    Leaf,
    Object(Vec<Entry<'a>>),
}

#[derive(Debug)]
struct Entry<'a> {
    key: &'a str,
    value: &'a str,
    kind: ValueKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueKind {
    String,
    Composite,
    Scalar,
}

fn scan_body(body: &str) -> KeyFetchResult<Body<'_>> {
    let mut scanner = Scanner::new(body);
    scanner.skip_ws();

    let result = match scanner.peek() {
        None => return Err(KeyFetchError::parse(scanner.pos, "empty body")),
        Some(b'{') => Body::Object(scanner.object()?),
        Some(b'[') => {
            return Err(KeyFetchError::parse(
                scanner.pos,
                "expected an object or a leaf value, found an array",
            ))
        }
        Some(_) => {
            scanner.value()?;
            Body::Leaf
        }
    };

    scanner.skip_ws();
    if scanner.pos != body.len() {
        return Err(KeyFetchError::parse(scanner.pos, "trailing characters after body"));
    }
    Ok(result)
}

/// A lone `"error"` field holding a string marks an error payload.
fn error_message(entries: &[Entry<'_>]) -> KeyFetchResult<Option<String>> {
    match entries {
        [entry] if entry.key == "error" && entry.kind == ValueKind::String => {
            let message: String = serde_json::from_str(entry.value)
                .map_err(|e| KeyFetchError::parse(0, format!("bad error message: {e}")))?;
            Ok(Some(message))
        }
        _ => Ok(None),
    }
}

struct Scanner<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, expected: u8) -> KeyFetchResult<()> {
        match self.peek() {
            Some(b) if b == expected => {
                self.pos += 1;
                Ok(())
            }
            Some(b) => Err(KeyFetchError::parse(
                self.pos,
                format!("expected {:?}, found {:?}", expected as char, b as char),
            )),
            None => Err(self.eof(&format!("expected {:?}", expected as char))),
        }
    }

    fn eof(&self, what: &str) -> KeyFetchError {
        KeyFetchError::parse(self.pos, format!("unexpected end of body, {what}"))
    }

    fn literal(&mut self, word: &[u8]) -> KeyFetchResult<()> {
        if self.bytes[self.pos..].starts_with(word) {
            self.pos += word.len();
            Ok(())
        } else {
            Err(KeyFetchError::parse(self.pos, "invalid literal"))
        }
    }

    /// Top-level object; cursor on `{`.
    fn object(&mut self) -> KeyFetchResult<Vec<Entry<'a>>> {
        self.expect(b'{')?;
        let mut entries = Vec::new();

        self.skip_ws();
        if self.peek() == Some(b'}') {
            self.pos += 1;
            return Ok(entries);
        }

        loop {
            self.skip_ws();
            if self.peek() != Some(b'"') {
                return Err(KeyFetchError::parse(self.pos, "expected a quoted key"));
            }
            let key = self.string_contents()?;
            self.skip_ws();
            self.expect(b':')?;
            self.skip_ws();
            let (kind, value) = self.value()?;
            entries.push(Entry { key, value, kind });

            self.skip_ws();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b'}') => {
                    self.pos += 1;
                    return Ok(entries);
                }
                Some(b) => {
                    return Err(KeyFetchError::parse(
                        self.pos,
                        format!("expected ',' or '}}', found {:?}", b as char),
                    ))
                }
                None => return Err(self.eof("object not closed")),
            }
        }
    }

    /// Skip one value and return its raw text.
    fn value(&mut self) -> KeyFetchResult<(ValueKind, &'a str)> {
        let start = self.pos;
        let kind = match self.peek() {
            Some(b'"') => {
                self.string_contents()?;
                ValueKind::String
            }
            Some(b'{' | b'[') => {
                self.composite()?;
                ValueKind::Composite
            }
            Some(b't') => {
                self.literal(b"true")?;
                ValueKind::Scalar
            }
            Some(b'f') => {
                self.literal(b"false")?;
                ValueKind::Scalar
            }
            Some(b'n') => {
                self.literal(b"null")?;
                ValueKind::Scalar
            }
            Some(b'-' | b'0'..=b'9') => {
                self.number()?;
                ValueKind::Scalar
            }
            Some(b) => {
                return Err(KeyFetchError::parse(
                    self.pos,
                    format!("unexpected {:?} at start of value", b as char),
                ))
            }
            None => return Err(self.eof("expected a value")),
        };
        Ok((kind, &self.src[start..self.pos]))
    }

    /// Quoted string; cursor on the opening quote. Returns the text between
    /// the quotes without unescaping it.
    fn string_contents(&mut self) -> KeyFetchResult<&'a str> {
        self.expect(b'"')?;
        let start = self.pos;
        loop {
            match self.peek() {
                None => return Err(self.eof("string not closed")),
                Some(b'"') => {
                    let contents = &self.src[start..self.pos];
                    self.pos += 1;
                    return Ok(contents);
                }
                Some(b'\\') => {
                    self.pos += 1;
                    self.escape()?;
                }
                Some(b) if b < 0x20 => {
                    return Err(KeyFetchError::parse(self.pos, "control character in string"))
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    fn escape(&mut self) -> KeyFetchResult<()> {
        match self.peek() {
            Some(b'"' | b'\\' | b'/' | b'b' | b'f' | b'n' | b'r' | b't') => {
                self.pos += 1;
                Ok(())
            }
            Some(b'u') => {
                let hex = self.bytes.get(self.pos + 1..self.pos + 5);
                match hex {
                    Some(digits) if digits.iter().all(u8::is_ascii_hexdigit) => {
                        self.pos += 5;
                        Ok(())
                    }
                    _ => Err(KeyFetchError::parse(self.pos, "invalid \\u escape")),
                }
            }
            Some(_) => Err(KeyFetchError::parse(self.pos, "invalid escape sequence")),
            None => Err(self.eof("escape not finished")),
        }
    }

    /// Nested object or array; only bracket balance and strings are checked.
    fn composite(&mut self) -> KeyFetchResult<()> {
        let mut closers: Vec<u8> = Vec::new();
        loop {
            match self.peek() {
                None => return Err(self.eof("nested value not closed")),
                Some(b'"') => {
                    self.string_contents()?;
                }
                Some(b'{') => {
                    closers.push(b'}');
                    self.pos += 1;
                }
                Some(b'[') => {
                    closers.push(b']');
                    self.pos += 1;
                }
                Some(b @ (b'}' | b']')) => {
                    if closers.pop() != Some(b) {
                        return Err(KeyFetchError::parse(self.pos, "mismatched bracket"));
                    }
                    self.pos += 1;
                    if closers.is_empty() {
                        return Ok(());
                    }
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    fn number(&mut self) -> KeyFetchResult<()> {
        let start = self.pos;
        if self.peek() == Some(b'-') {
            self.pos += 1;
        }
        match self.peek() {
            Some(b'0') => self.pos += 1,
            Some(b'1'..=b'9') => self.digits(),
            _ => return Err(KeyFetchError::parse(start, "invalid number")),
        }
        if self.peek() == Some(b'.') {
            self.pos += 1;
            if !self.peek().is_some_and(|b| b.is_ascii_digit()) {
                return Err(KeyFetchError::parse(start, "invalid number"));
            }
            self.digits();
        }
        if matches!(self.peek(), Some(b'e' | b'E')) {
            self.pos += 1;
            if matches!(self.peek(), Some(b'+' | b'-')) {
                self.pos += 1;
            }
            if !self.peek().is_some_and(|b| b.is_ascii_digit()) {
                return Err(KeyFetchError::parse(start, "invalid number"));
            }
            self.digits();
        }
        Ok(())
    }

    fn digits(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(body: &str) -> Vec<String> {
        extract_keys(body).unwrap().into_vec()
    }

    fn parse_err(body: &str) -> usize {
        match extract_keys(body) {
            Err(KeyFetchError::Parse { offset, .. }) => offset,
            other => panic!("expected parse error for {body:?}, got {other:?}"),
        }
    }

    #[test]
    fn test_shallow_body() {
        let body = r#"{"four":true,"one":1,"three":true,"two":"two"}"#;
        let mut found = keys(body);
        found.sort();
        assert_eq!(found, vec!["four", "one", "three", "two"]);
    }

    #[test]
    fn test_nested_keys_not_reported() {
        let body = r#"{ "one": 1, "two": "two", "three": true,
                       "four": { "five": 5, "six": 6, "seven": 7 } }"#;
        assert_eq!(keys(body), vec!["one", "two", "three", "four"]);
    }

    #[test]
    fn test_null_and_empty_object() {
        assert!(extract_keys("null").unwrap().is_empty());
        assert!(extract_keys("  null\n").unwrap().is_empty());
        assert!(extract_keys("{}").unwrap().is_empty());
        assert!(extract_keys("{ \n }").unwrap().is_empty());
    }

    #[test]
    fn test_permission_denied_payload() {
        let err = extract_keys(r#"{"error":"Permission denied"}"#).unwrap_err();
        assert_eq!(err, KeyFetchError::PermissionDenied("Permission denied".into()));

        let err = extract_keys("{\n  \"error\" : \"Permission denied\"\n}\n").unwrap_err();
        assert!(err.is_permission_error());
    }

    #[test]
    fn test_other_remote_error() {
        let err = extract_keys(r#"{"error":"Index not defined, add \".indexOn\""}"#).unwrap_err();
        assert_eq!(
            err,
            KeyFetchError::Remote("Index not defined, add \".indexOn\"".into())
        );
    }

    #[test]
    fn test_leaf_value_has_no_children() {
        for body in ["1", "-2.5e3", "true", "false", r#""two""#, " 42\n", r#""Permission denied""#] {
            assert!(extract_keys(body).unwrap().is_empty(), "{body:?}");
        }
        assert_eq!(error_payload("42"), None);
    }

    #[test]
    fn test_error_key_among_children_is_data() {
        assert_eq!(keys(r#"{"error":"x","other":true}"#), vec!["error", "other"]);
        assert_eq!(keys(r#"{"error":true}"#), vec!["error"]);
    }

    #[test]
    fn test_escaped_keys_kept_verbatim() {
        let body = r#"{"say \"hi\"":true,"caf\u00e9":true,"back\\slash":true,"tab\there":true}"#;
        assert_eq!(
            keys(body),
            vec![r#"say \"hi\""#, r"caf\u00e9", r"back\\slash", r"tab\there"]
        );
    }

    #[test]
    fn test_raw_unicode_key() {
        assert_eq!(keys(r#"{"日本":true,"ü":1}"#), vec!["日本", "ü"]);
    }

    #[test]
    fn test_tricky_values_skipped() {
        let body = r#"{"a":"}{\"","b":[1,{"c":"]"}],"d":-1.5e+3,"e":null,"f":false,"g":0}"#;
        assert_eq!(keys(body), vec!["a", "b", "d", "e", "f", "g"]);
    }

    #[test]
    fn test_duplicate_keys_collapsed() {
        assert_eq!(keys(r#"{"a":1,"a":2,"b":3}"#), vec!["a", "b"]);
    }

    #[test]
    fn test_malformed_bodies() {
        assert_eq!(parse_err(""), 0);
        assert_eq!(parse_err("   "), 3);
        parse_err("nul");
        parse_err("nullx");
        parse_err("[1,2]");
        parse_err("[]");
        parse_err("01");
        parse_err(r#""unterminated"#);
        parse_err("true false");
        parse_err("<html>");
        parse_err(r#"{"a":}"#);
        parse_err(r#"{"a":1"#);
        parse_err(r#"{"a":1,}"#);
        parse_err(r#"{a:1}"#);
        parse_err(r#"{"a" 1}"#);
        parse_err(r#"{"a":[1,2}"#);
        parse_err(r#"{"a":{"b":1}"#);
        parse_err(r#"{"a\q":1}"#);
        parse_err(r#"{"a\u12":1}"#);
        parse_err("{\"a\nb\":1}");
        parse_err(r#"{"a":01}"#);
        parse_err(r#"{"a":1.}"#);
        parse_err(r#"{"a":tru}"#);
        parse_err(r#"{"a":+1}"#);
    }

    #[test]
    fn test_trailing_garbage_offset() {
        assert_eq!(parse_err(r#"{"a":1} x"#), 8);
    }

    #[test]
    fn test_error_payload_helper() {
        assert_eq!(
            error_payload(r#"{"error":"Permission denied"}"#).as_deref(),
            Some("Permission denied")
        );
        assert_eq!(error_payload(r#"{"a":true}"#), None);
        assert_eq!(error_payload("<html>Bad Gateway</html>"), None);
        assert_eq!(error_payload("null"), None);
    }
}
