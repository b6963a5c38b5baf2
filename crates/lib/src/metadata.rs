//! Per-node metadata.
//!
//! Metadata is an open key/value map. A handful of keys are reserved and have
//! typed accessors:
//!
//! - `validator` - a [`Callable`] predicate gating every assignment
//! - `url` - remote resource backing the node
//! - `refreshRate` - poll interval in milliseconds (`-1` fetches once)
//! - `name` - local name of a root composite
//! - `lastModified` - RFC 3339 timestamp of the last applied remote update
//!
//! Entries keep insertion order so serialized metadata reads back the same way.

use chrono::{DateTime, Utc};

use crate::{
    document::Document,
    value::{Callable, Value},
};

/// Reserved metadata key names.
pub mod keys {
    pub const VALIDATOR: &str = "validator";
    pub const URL: &str = "url";
    pub const REFRESH_RATE: &str = "refreshRate";
    pub const NAME: &str = "name";
    pub const LAST_MODIFIED: &str = "lastModified";
}

/// Open metadata map attached to every node.
///
/// ```
/// # use canopy::{Metadata, Value};
/// let md = Metadata::new()
///     .with_predicate(|v| v.as_int().is_some_and(|n| n > 0))
///     .with("owner", "ops");
///
/// assert!(md.validator().is_some());
/// assert_eq!(md.get("owner"), Some(&Value::from("ops")));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    entries: Document,
}

impl Metadata {
    /// Creates empty metadata
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds metadata from a serialized metadata document
    pub fn from_document(doc: &Document) -> Self {
        Self {
            entries: doc.clone(),
        }
    }

    /// Serializes to a document, validator included as a callable
    pub fn to_document(&self) -> Document {
        self.entries.clone()
    }

    /// Builder-style insert of an arbitrary key
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Sets the validator to an existing callable
    pub fn with_validator(self, validator: Callable) -> Self {
        self.with(keys::VALIDATOR, validator)
    }

    /// Sets the validator from a predicate
    pub fn with_predicate(self, f: impl Fn(&Value) -> bool + 'static) -> Self {
        self.with_validator(Callable::predicate(f))
    }

    /// Sets the remote resource url
    pub fn with_url(self, url: impl Into<String>) -> Self {
        self.with(keys::URL, url.into())
    }

    /// Sets the remote refresh rate in milliseconds
    pub fn with_refresh_rate(self, millis: i64) -> Self {
        self.with(keys::REFRESH_RATE, millis)
    }

    /// Sets the local name used by root composites
    pub fn with_name(self, name: impl Into<String>) -> Self {
        self.with(keys::NAME, name.into())
    }

    /// Inserts a value, returning the previous one
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.entries.insert(key, value)
    }

    /// Removes a key
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.remove(key)
    }

    /// Raw access to any key, reserved ones included
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Returns true if no keys are set
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Iterates over all keys in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }

    /// The validator, if one is set and callable
    pub fn validator(&self) -> Option<Callable> {
        self.get(keys::VALIDATOR)
            .and_then(Value::as_callable)
            .cloned()
    }

    /// The remote url, if set and non-empty
    pub fn url(&self) -> Option<&str> {
        self.get(keys::URL)
            .and_then(Value::as_text)
            .filter(|url| !url.is_empty())
    }

    /// The refresh rate in milliseconds, if set
    pub fn refresh_rate(&self) -> Option<i64> {
        match self.get(keys::REFRESH_RATE)? {
            Value::Int(n) => Some(*n),
            Value::Float(x) if x.is_finite() => Some(*x as i64),
            _ => None,
        }
    }

    /// The configured local name, if set
    pub fn name(&self) -> Option<&str> {
        self.get(keys::NAME).and_then(Value::as_text)
    }

    /// The last applied remote modification time, if set and parseable
    pub fn last_modified(&self) -> Option<DateTime<Utc>> {
        let text = self.get(keys::LAST_MODIFIED)?.as_text()?;
        DateTime::parse_from_rfc3339(text)
            .or_else(|_| DateTime::parse_from_rfc2822(text))
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Records the last applied remote modification time
    pub fn set_last_modified(&mut self, at: DateTime<Utc>) {
        self.insert(keys::LAST_MODIFIED, at.to_rfc3339());
    }

    /// Returns true if a remote poller should track the owning node.
    ///
    /// Both a non-empty `url` and a non-zero `refreshRate` are required.
    pub fn is_remote(&self) -> bool {
        self.url().is_some() && self.refresh_rate().is_some_and(|rate| rate != 0)
    }
}

impl From<Document> for Metadata {
    fn from(entries: Document) -> Self {
        Self { entries }
    }
}
