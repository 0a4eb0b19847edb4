//! Data connector module
//!
//! Supports: local filesystem, S3, R2, GCS, Azure (via `object_store`) and
//! PostgreSQL, MySQL, SQLite, DuckDB (via DuckDB).
//!
//! # Overview
//!
//! A connector enumerates the raw candidates of an asset (file names under a
//! prefix, or distinct date parts of a SQL column), applies the asset's
//! partitioner and returns `(location, key)` pairs. Enumeration is the only
//! step of batch resolution that performs I/O; it runs under a
//! [`ListContext`] carrying a deadline and a cancellation token.

mod sql;
mod store;
mod types;

pub use sql::{SqlConnectionConfig, SqlConnector, SqlEngine};
pub use store::ObjectStoreConnector;
pub use types::{CancellationToken, DataConnector, ListContext};

#[cfg(test)]
mod tests;
