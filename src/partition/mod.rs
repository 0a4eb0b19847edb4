//! Partition module
//!
//! Supports: Yearly, Monthly, Daily and Path partitioners over file names,
//! plus date-part partitioners over SQL columns.
//!
//! # Overview
//!
//! A partitioner turns a candidate location (a file name relative to the
//! asset's prefix, or a SQL relation) into a [`PartitionKey`]: an ordered
//! mapping from param name to value. Names that do not match are dropped
//! silently so that heterogeneous directories work.

mod partitioner;
mod types;

pub(crate) use partitioner::validate_identifier;
pub use partitioner::{
    ColumnPartitioner, FilePartitioner, PartitionerKind, PathPartitioner, Pattern, Partitioner,
    RegexPartitioner,
};
pub use types::{BatchOptions, Location, Partition, PartitionKey, PartitionValue};

#[cfg(test)]
mod tests;
