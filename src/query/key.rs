use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt;

/// Structured cache key, e.g. `["GroupInfo", {"id": "g1"}]`.
///
/// Two keys address the same entry when their JSON text is identical. Object
/// segments serialise with sorted field names, so the order fields were
/// written in never matters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryKey(Vec<Value>);

impl QueryKey {
    pub fn new(name: &str) -> Self {
        Self(vec![Value::String(name.to_string())])
    }

    pub fn from_segments(segments: Vec<Value>) -> Self {
        Self(segments)
    }

    /// Append a segment
    pub fn with(mut self, segment: impl Into<Value>) -> Self {
        self.0.push(segment.into());
        self
    }

    pub fn segments(&self) -> &[Value] {
        &self.0
    }

    /// Canonical JSON text of the key
    pub fn canonical(&self) -> String {
        Value::Array(self.0.iter().map(sorted).collect()).to_string()
    }

    /// SHA-256 of the canonical text, used as the cache slot
    pub fn hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.canonical().as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// True if `prefix`'s segments lead this key
    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        prefix.0.len() <= self.0.len() && self.0.iter().zip(&prefix.0).all(|(a, b)| a == b)
    }
}

// Rebuild objects with their fields inserted in sorted order
fn sorted(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(entries.into_iter().map(|(k, v)| (k.clone(), sorted(v))).collect())
        }
        Value::Array(items) => Value::Array(items.iter().map(sorted).collect()),
        other => other.clone(),
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical())
    }
}

impl From<&str> for QueryKey {
    fn from(name: &str) -> Self {
        QueryKey::new(name)
    }
}
