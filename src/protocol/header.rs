//! Ordered, case-preserving, multi-value header collection.
//!
//! HTTP headers legitimately repeat (`Set-Cookie` being the canonical case),
//! so the store maps a name to an ordered list of values and never collapses
//! duplicates. Lookup is case-insensitive while the casing seen first is
//! preserved for serialization, as is overall insertion order.

use std::fmt;

// Header names used by the crate itself.
pub const CONTENT_LENGTH: &str = "Content-Length";
pub const CONTENT_TYPE: &str = "Content-Type";
pub const TRANSFER_ENCODING: &str = "Transfer-Encoding";
pub const CONNECTION: &str = "Connection";
pub const DATE: &str = "Date";
pub const HOST: &str = "Host";
pub const LOCATION: &str = "Location";
pub const SERVER: &str = "Server";
pub const USER_AGENT: &str = "User-Agent";

// MIME types for the convenience response constructors.
pub const MIME_TEXT_PLAIN: &str = "text/plain";
pub const MIME_TEXT_HTML: &str = "text/html";
pub const MIME_APPLICATION_JSON: &str = "application/json";

/// Checks a name against the header-name grammar:
/// an alphanumeric first byte followed by alphanumerics and hyphens.
pub fn is_valid_header_name(name: &str) -> bool {
    let mut bytes = name.bytes();
    match bytes.next() {
        Some(b) if b.is_ascii_alphanumeric() => {}
        _ => return false,
    }
    bytes.all(|b| b.is_ascii_alphanumeric() || b == b'-')
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    name: String,
    values: Vec<String>,
}

/// A mapping from header name to an ordered sequence of values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
    entries: Vec<Entry>,
}

impl HeaderMap {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.name.eq_ignore_ascii_case(name))
    }

    /// Appends a value, preserving earlier values under the same name.
    /// The casing of the first occurrence wins for serialization.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.position(&name) {
            Some(i) => self.entries[i].values.push(value),
            None => self.entries.push(Entry { name, values: vec![value] }),
        }
    }

    /// Replaces every value stored under `name` with a single value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.position(&name) {
            Some(i) => self.entries[i].values = vec![value],
            None => self.entries.push(Entry { name, values: vec![value] }),
        }
    }

    /// Returns the first value stored under `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.position(name).and_then(|i| self.entries[i].values.first().map(String::as_str))
    }

    /// Returns every value stored under `name`, in insertion order.
    pub fn get_all(&self, name: &str) -> &[String] {
        match self.position(name) {
            Some(i) => &self.entries[i].values,
            None => &[],
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Removes a name and all of its values; returns whether it was present.
    pub fn remove(&mut self, name: &str) -> bool {
        match self.position(name) {
            Some(i) => {
                self.entries.remove(i);
                true
            }
            None => false,
        }
    }

    /// Number of distinct header names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(name, value)` pairs in insertion order; names with
    /// multiple values yield one pair per value.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .flat_map(|e| e.values.iter().map(move |v| (e.name.as_str(), v.as_str())))
    }

    /// Header names in insertion order, with original casing.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    /// The first `Content-Length` value parsed as a non-negative decimal,
    /// or 0 when the header is absent or unparseable. Strict validation
    /// belongs to the parser.
    pub fn content_length(&self) -> u64 {
        self.get(CONTENT_LENGTH).and_then(|v| v.trim().parse().ok()).unwrap_or(0)
    }
}

impl fmt::Display for HeaderMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in self.iter() {
            writeln!(f, "{name}: {value}")?;
        }
        Ok(())
    }
}
