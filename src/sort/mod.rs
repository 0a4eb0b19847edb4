//! Sorting module
//!
//! Orders partition keys by an ordered list of [`Sorter`]s, each naming a
//! field and a direction. Fields whose observed values all parse as integers
//! compare numerically; otherwise the whole field compares as strings.

mod sorter;

pub use sorter::{sort_by_keys, sort_keys, Sorter};
