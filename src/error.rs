//! Error types for batchkit
//!
//! This module defines the error hierarchy for the entire crate.
//! All public APIs return `Result<T, Error>` where Error is defined here.
//!
//! Errors fall into two families callers usually care about:
//! configuration errors (raised before any I/O, never downgraded) and
//! connection errors (raised while enumerating a store). See [`ErrorKind`].

use thiserror::Error;

/// The main error type for batchkit
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing required config field: {field}")]
    MissingConfigField { field: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("Unknown field '{field}' in {context} for asset '{asset}'")]
    UnknownField {
        asset: String,
        field: String,
        context: String,
    },

    #[error("Asset '{asset}' already exists in datasource '{datasource}'")]
    DuplicateAsset { datasource: String, asset: String },

    #[error("Batch definition '{name}' already exists on asset '{asset}'")]
    DuplicateBatchDefinition { asset: String, name: String },

    #[error("Asset '{asset}' not found in datasource '{datasource}'")]
    AssetNotFound { datasource: String, asset: String },

    #[error("Batch definition '{name}' not found on asset '{asset}'")]
    BatchDefinitionNotFound { asset: String, name: String },

    #[error("Unknown asset type '{name}'")]
    UnknownAssetType { name: String },

    #[error("Undefined variable in config: {variable}")]
    UndefinedVariable { variable: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Connection Errors
    // ============================================================================
    #[error("Connection to '{target}' failed: {message}")]
    Connection { target: String, message: String },

    #[error("Object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    #[error("Database error: {0}")]
    Database(#[from] duckdb::Error),

    #[error("Listing timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Listing cancelled")]
    Cancelled,

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

/// Coarse classification of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Structural misconfiguration, raised before any I/O
    Configuration,
    /// The underlying store could not be reached or queried
    Connection,
    /// The caller's deadline or cancellation token fired
    Interrupted,
    /// Anything else
    Other,
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingConfigField {
            field: field.into(),
        }
    }

    /// Create an invalid value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an invalid pattern error
    pub fn invalid_pattern(pattern: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            message: message.into(),
        }
    }

    /// Create an unknown field error
    pub fn unknown_field(
        asset: impl Into<String>,
        field: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        Self::UnknownField {
            asset: asset.into(),
            field: field.into(),
            context: context.into(),
        }
    }

    /// Create a connection error
    pub fn connection(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connection {
            target: target.into(),
            message: message.into(),
        }
    }

    /// Create an undefined variable error
    pub fn undefined_var(variable: impl Into<String>) -> Self {
        Self::UndefinedVariable {
            variable: variable.into(),
        }
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Config { .. }
            | Error::MissingConfigField { .. }
            | Error::InvalidConfigValue { .. }
            | Error::InvalidPattern { .. }
            | Error::UnknownField { .. }
            | Error::DuplicateAsset { .. }
            | Error::DuplicateBatchDefinition { .. }
            | Error::AssetNotFound { .. }
            | Error::BatchDefinitionNotFound { .. }
            | Error::UnknownAssetType { .. }
            | Error::UndefinedVariable { .. }
            | Error::YamlParse(_)
            | Error::JsonParse(_) => ErrorKind::Configuration,
            Error::Connection { .. } | Error::ObjectStore(_) | Error::Database(_) => {
                ErrorKind::Connection
            }
            Error::Timeout { .. } | Error::Cancelled => ErrorKind::Interrupted,
            _ => ErrorKind::Other,
        }
    }

    /// Check if this is a configuration error
    pub fn is_configuration(&self) -> bool {
        self.kind() == ErrorKind::Configuration
    }

    /// Check if this is a connection error
    pub fn is_connection(&self) -> bool {
        self.kind() == ErrorKind::Connection
    }
}

/// Result type alias for batchkit
pub type Result<T> = std::result::Result<T, Error>;
