//! Multi-key ordering over partition keys

use crate::error::{Error, Result};
use crate::partition::{PartitionKey, PartitionValue};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Ordering rule over one partition field
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sorter {
    /// Field name to sort by
    pub key: String,
    /// Sort descending when set
    #[serde(default)]
    pub reverse: bool,
}

impl Sorter {
    /// Ascending sorter
    pub fn asc(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            reverse: false,
        }
    }

    /// Descending sorter
    pub fn desc(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            reverse: true,
        }
    }

    /// Parse the shorthand form: `"year"`, `"+year"` or `"-year"`
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let (key, reverse) = if let Some(stripped) = s.strip_prefix('-') {
            (stripped, true)
        } else if let Some(stripped) = s.strip_prefix('+') {
            (stripped, false)
        } else {
            (s, false)
        };

        let key = key.trim();
        if key.is_empty() {
            return Err(Error::invalid_value(
                "order_by",
                format!("'{s}' does not name a field"),
            ));
        }

        Ok(Self {
            key: key.to_string(),
            reverse,
        })
    }
}

impl FromStr for Sorter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Sorter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.reverse { '-' } else { '+' };
        write!(f, "{sign}{}", self.key)
    }
}

// ============================================================================
// Sorting
// ============================================================================

/// How one field is compared, decided once per sort over all observed values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldOrdering {
    Integer,
    Lexicographic,
}

impl FieldOrdering {
    fn infer<'a>(values: impl Iterator<Item = Option<&'a PartitionValue>>) -> Self {
        let all_int = values
            .flatten()
            .all(|value| value.as_int().is_some());
        if all_int {
            FieldOrdering::Integer
        } else {
            FieldOrdering::Lexicographic
        }
    }
}

/// Precomputed comparable value for one field of one item
///
/// `Missing` orders before everything else, so missing values come first
/// ascending and last descending.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum SortValue {
    Missing,
    Int(i64),
    Str(String),
}

impl SortValue {
    fn new(value: Option<&PartitionValue>, ordering: FieldOrdering) -> Self {
        match (value, ordering) {
            (None, _) => SortValue::Missing,
            (Some(v), FieldOrdering::Integer) => v.as_int().map_or(SortValue::Missing, SortValue::Int),
            (Some(v), FieldOrdering::Lexicographic) => SortValue::Str(v.to_string()),
        }
    }
}

/// Stable multi-key sort of `items` by `sorters`
///
/// Comparison is lexicographic over the sorters, each level inverted when its
/// `reverse` flag is set. Ties keep their input order.
pub fn sort_by_keys<T, F>(items: &mut Vec<T>, sorters: &[Sorter], key_of: F)
where
    F: Fn(&T) -> &PartitionKey,
{
    if sorters.is_empty() || items.len() < 2 {
        return;
    }

    let orderings: Vec<FieldOrdering> = sorters
        .iter()
        .map(|sorter| FieldOrdering::infer(items.iter().map(|item| key_of(item).get(&sorter.key))))
        .collect();

    let mut decorated: Vec<(Vec<SortValue>, T)> = items
        .drain(..)
        .map(|item| {
            let values: Vec<SortValue> = sorters
                .iter()
                .zip(&orderings)
                .map(|(sorter, ordering)| SortValue::new(key_of(&item).get(&sorter.key), *ordering))
                .collect();
            (values, item)
        })
        .collect();

    decorated.sort_by(|(a, _), (b, _)| compare(a, b, sorters));
    items.extend(decorated.into_iter().map(|(_, item)| item));
}

fn compare(a: &[SortValue], b: &[SortValue], sorters: &[Sorter]) -> Ordering {
    for ((left, right), sorter) in a.iter().zip(b).zip(sorters) {
        let ordering = left.cmp(right);
        let ordering = if sorter.reverse {
            ordering.reverse()
        } else {
            ordering
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// Sort partition keys in place
pub fn sort_keys(keys: &mut Vec<PartitionKey>, sorters: &[Sorter]) {
    sort_by_keys(keys, sorters, |key| key);
}
