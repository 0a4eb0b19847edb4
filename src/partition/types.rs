//! Partition types
//!
//! Defines partition keys, their scalar values and the (location, key)
//! pairs produced by enumeration.

use crate::error::{Error, Result};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Constraints supplied with a batch request: param name to required value
pub type BatchOptions = BTreeMap<String, PartitionValue>;

/// A single scalar value captured for a partition field
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PartitionValue {
    /// Integer value (SQL date parts, numeric options)
    Int(i64),
    /// String value (regex captures)
    Str(String),
}

impl PartitionValue {
    /// Interpret this value as an integer, if it is one or parses cleanly as one
    pub fn as_int(&self) -> Option<i64> {
        match self {
            PartitionValue::Int(i) => Some(*i),
            PartitionValue::Str(s) => s.parse().ok(),
        }
    }

    /// Exact equality, allowing an integer to match its canonical string form
    ///
    /// `Int(1)` matches `Str("1")` but not `Str("01")`.
    pub fn matches(&self, other: &PartitionValue) -> bool {
        match (self, other) {
            (PartitionValue::Int(a), PartitionValue::Int(b)) => a == b,
            (PartitionValue::Str(a), PartitionValue::Str(b)) => a == b,
            (PartitionValue::Int(i), PartitionValue::Str(s))
            | (PartitionValue::Str(s), PartitionValue::Int(i)) => i.to_string() == *s,
        }
    }
}

impl fmt::Display for PartitionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartitionValue::Int(i) => write!(f, "{i}"),
            PartitionValue::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for PartitionValue {
    fn from(value: i64) -> Self {
        PartitionValue::Int(value)
    }
}

impl From<&str> for PartitionValue {
    fn from(value: &str) -> Self {
        PartitionValue::Str(value.to_string())
    }
}

impl From<String> for PartitionValue {
    fn from(value: String) -> Self {
        PartitionValue::Str(value)
    }
}

impl TryFrom<&Value> for PartitionValue {
    type Error = Error;

    fn try_from(value: &Value) -> Result<Self> {
        match value {
            Value::String(s) => Ok(PartitionValue::Str(s.clone())),
            Value::Number(n) => n
                .as_i64()
                .map(PartitionValue::Int)
                .ok_or_else(|| Error::invalid_value("options", format!("{n} is not an integer"))),
            other => Err(Error::invalid_value(
                "options",
                format!("expected a string or integer, got {other}"),
            )),
        }
    }
}

/// Ordered mapping from field name to value identifying one partition
///
/// Field order follows the partitioner's `param_names`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct PartitionKey {
    fields: Vec<(String, PartitionValue)>,
}

impl PartitionKey {
    /// Create an empty key
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field, replacing any existing value for the same name
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<PartitionValue>) -> Self {
        self.insert(field, value);
        self
    }

    /// Insert a field, replacing any existing value for the same name
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<PartitionValue>) {
        let field = field.into();
        let value = value.into();
        if let Some(slot) = self.fields.iter_mut().find(|(name, _)| *name == field) {
            slot.1 = value;
        } else {
            self.fields.push((field, value));
        }
    }

    /// Get a value by field name
    pub fn get(&self, field: &str) -> Option<&PartitionValue> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value)
    }

    /// Field names in order
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    /// Iterate over (field, value) pairs in order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PartitionValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the key has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Check every constrained field for exact equality
    ///
    /// Fields absent from `options` are wildcards. A constrained field the key
    /// does not carry never matches.
    pub fn matches(&self, options: &BatchOptions) -> bool {
        options.iter().all(|(field, expected)| {
            self.get(field)
                .is_some_and(|actual| actual.matches(expected))
        })
    }
}

impl Serialize for PartitionKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (name, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}: {value}")?;
        }
        f.write_str("}")
    }
}

/// Literal location of a batch
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Location {
    /// File path or object URL
    Path(String),
    /// SQL query selecting the batch
    Query(String),
}

impl Location {
    /// The raw location string
    pub fn as_str(&self) -> &str {
        match self {
            Location::Path(s) | Location::Query(s) => s,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One enumerated partition: where it lives and what identifies it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    /// Literal location
    pub location: Location,
    /// Extracted key
    pub key: PartitionKey,
}

impl Partition {
    /// Create a new partition
    pub fn new(location: Location, key: PartitionKey) -> Self {
        Self { location, key }
    }
}
