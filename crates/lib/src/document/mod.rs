//! Documents: the data shape trees are built from, serialized to and merged with.
//!
//! A [`Document`] is an insertion-ordered map from name to [`Value`]. Nested
//! documents describe nested composites. A sibling key ending in
//! [`METADATA_SUFFIX`] carries the metadata of the entry it is named after:
//!
//! ```
//! # use canopy::{Document, Value, METADATA_SUFFIX};
//! let doc = Document::new()
//!     .with("x", 1)
//!     .with(format!("x{METADATA_SUFFIX}"), Document::new().with("url", "http://example.test/x"));
//!
//! assert_eq!(doc.get("x"), Some(&Value::Int(1)));
//! assert!(doc.metadata_for("x").is_some());
//! assert_eq!(doc.entries().count(), 1); // metadata siblings are not entries
//! ```
//!
//! # JSON boundary
//!
//! Objects convert key for key. Arrays become documents keyed by index
//! (`"0"`, `"1"`, ...). Undefined values and callables have no JSON form and are
//! skipped when serializing.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::value::Value;

pub mod errors;

pub use errors::DocumentError;

/// Suffix marking a metadata sibling key (`name + METADATA_SUFFIX`).
pub const METADATA_SUFFIX: &str = "__metadata_suffix__";

/// Returns true if `key` names a metadata sibling rather than an entry.
pub fn is_metadata_key(key: &str) -> bool {
    key.ends_with(METADATA_SUFFIX)
}

/// Builds the metadata sibling key for an entry name.
pub fn metadata_key(name: &str) -> String {
    format!("{name}{METADATA_SUFFIX}")
}

/// An insertion-ordered mapping from name to [`Value`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    entries: IndexMap<String, Value>,
}

impl Document {
    /// Creates a new empty document
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, returning the document
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Inserts a value, returning the previous one. Existing keys keep their position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.entries.insert(key.into(), value.into())
    }

    /// Removes a key, preserving the order of the remaining keys
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.shift_remove(key)
    }

    /// Gets a value by key
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Gets a mutable value by key
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.entries.get_mut(key)
    }

    /// Returns true if the key is present, metadata siblings included
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of keys, metadata siblings included
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no keys at all
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over every key in insertion order, metadata siblings included
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }

    /// Iterates over keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    /// Iterates over data entries only, skipping metadata siblings
    pub fn entries(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter().filter(|(k, _)| !is_metadata_key(k))
    }

    /// The metadata sibling for `name`, if present and document-shaped
    pub fn metadata_for(&self, name: &str) -> Option<&Document> {
        self.entries
            .get(&metadata_key(name))
            .and_then(Value::as_document)
    }

    /// Converts to a JSON object, skipping values JSON cannot carry
    pub fn to_json(&self) -> serde_json::Value {
        let map = self
            .entries
            .iter()
            .filter_map(|(k, v)| v.to_json().map(|json| (k.clone(), json)))
            .collect::<serde_json::Map<_, _>>();
        serde_json::Value::Object(map)
    }

    /// Parses a JSON string into a document
    pub fn from_json_str(s: &str) -> crate::Result<Self> {
        let json: serde_json::Value = serde_json::from_str(s)?;
        Ok(Self::try_from(json)?)
    }

    /// Builds a document from a JSON object or array.
    ///
    /// Callers must pass a container; scalars yield an empty document.
    pub(crate) fn from_json_container(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Object(map) => map
                .into_iter()
                .map(|(k, v)| (k, Value::from(v)))
                .collect(),
            serde_json::Value::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, v)| (i.to_string(), Value::from(v)))
                .collect(),
            _ => Self::new(),
        }
    }
}

fn json_type_name(json: &serde_json::Value) -> &'static str {
    match json {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

impl TryFrom<serde_json::Value> for Document {
    type Error = DocumentError;

    fn try_from(json: serde_json::Value) -> Result<Self, Self::Error> {
        match json {
            json @ (serde_json::Value::Object(_) | serde_json::Value::Array(_)) => {
                Ok(Self::from_json_container(json))
            }
            other => Err(DocumentError::NotADocument {
                actual: json_type_name(&other).to_string(),
            }),
        }
    }
}

impl TryFrom<Value> for Document {
    type Error = DocumentError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Doc(doc) => Ok(doc),
            other => Err(DocumentError::NotADocument {
                actual: other.type_name().to_string(),
            }),
        }
    }
}

impl FromIterator<(String, Value)> for Document {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Document {
    type Item = (&'a String, &'a Value);
    type IntoIter = indexmap::map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let json = serde_json::Value::deserialize(deserializer)?;
        Document::try_from(json).map_err(serde::de::Error::custom)
    }
}
