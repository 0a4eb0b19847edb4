//! Batch module
//!
//! Turns a [`BatchRequest`] into an ordered list of [`BatchSpec`]s.
//!
//! # Overview
//!
//! Resolution runs in full on every call:
//!
//! 1. **Configured** - asset, batch definition and option fields are checked
//!    (no I/O happens if anything is wrong)
//! 2. **Enumerated** - the connector lists partitions
//! 3. **Filtered** - exact equality on every constrained field
//! 4. **Sorted** - the asset's sorters, or the partitioner's natural order
//! 5. **Resolved** - each survivor becomes a `BatchSpec`

mod request;
mod spec;

pub use request::{
    resolve, resolve_with_stats, validate_request, BatchRequest, ResolutionStage, ResolutionStats,
};
pub use spec::{BatchSpec, BatchSpecTemplate};
