//! Common types used throughout batchkit
//!
//! This module contains shared type definitions, type aliases,
//! and utility types used across multiple modules.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// Opaque per-format read options passed through to the reader.
///
/// Ordered so that serialized batch specs are byte-for-byte reproducible.
pub type ReadOptions = BTreeMap<String, JsonValue>;

// ============================================================================
// Identifier
// ============================================================================

/// Globally unique identifier for assets and batch definitions
///
/// Assigned once at creation and never regenerated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
    /// Generate a fresh random identifier
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Get the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Identifier {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Identifier {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ============================================================================
// Connector Family
// ============================================================================

/// Kind of backing store an asset lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectorFamily {
    /// Files on a local filesystem or in an object store
    FilePath,
    /// Tables or queries in a SQL database
    Sql,
}

impl fmt::Display for ConnectorFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectorFamily::FilePath => write!(f, "file_path"),
            ConnectorFamily::Sql => write!(f, "sql"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_generate_unique() {
        let a = Identifier::generate();
        let b = Identifier::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 36);
    }

    #[test]
    fn test_identifier_serde_transparent() {
        let id = Identifier::from("abc-123");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc-123\"");
        let back: Identifier = serde_json::from_str("\"abc-123\"").unwrap();
        assert_eq!(back, id);
    }
}
