//! Partitioner implementations
//!
//! File partitioners derive a [`PartitionKey`] from a file name through a
//! regular expression with named capture groups. Column partitioners split a
//! SQL table on the date parts of a column.

use super::types::PartitionKey;
use crate::error::{Error, Result};
use crate::types::ConnectorFamily;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

/// Plain or schema-qualified SQL identifier
static IDENTIFIER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*){0,2}$").unwrap()
});

/// Validate a SQL identifier (table or column name)
pub(crate) fn validate_identifier(field: &str, value: &str) -> Result<()> {
    if IDENTIFIER_REGEX.is_match(value) {
        Ok(())
    } else {
        Err(Error::invalid_value(
            field,
            format!("'{value}' is not a valid SQL identifier"),
        ))
    }
}

// ============================================================================
// Partitioner Kind
// ============================================================================

/// Partitioner variant tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartitionerKind {
    /// One batch per year
    Yearly,
    /// One batch per (year, month)
    Monthly,
    /// One batch per (year, month, day)
    Daily,
    /// One batch per matching path, ordered by the path itself
    Path,
}

impl PartitionerKind {
    /// Default parameter names extracted by this kind
    pub fn default_param_names(self) -> &'static [&'static str] {
        match self {
            PartitionerKind::Yearly => &["year"],
            PartitionerKind::Monthly => &["year", "month"],
            PartitionerKind::Daily => &["year", "month", "day"],
            PartitionerKind::Path => &[],
        }
    }
}

impl fmt::Display for PartitionerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartitionerKind::Yearly => write!(f, "yearly"),
            PartitionerKind::Monthly => write!(f, "monthly"),
            PartitionerKind::Daily => write!(f, "daily"),
            PartitionerKind::Path => write!(f, "path"),
        }
    }
}

// ============================================================================
// Pattern
// ============================================================================

/// A compiled regular expression that must match a whole name
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    anchored: Regex,
}

impl Pattern {
    /// Compile a pattern, failing with a configuration error if it is invalid
    pub fn compile(source: &str) -> Result<Self> {
        if source.is_empty() {
            return Err(Error::invalid_pattern(source, "pattern cannot be empty"));
        }
        Regex::new(source).map_err(|e| Error::invalid_pattern(source, e.to_string()))?;
        // In verbose mode a trailing `# comment` runs to end of line, so the
        // closing group needs a line of its own
        let anchored = Regex::new(&format!("^(?:{source})$"))
            .or_else(|_| Regex::new(&format!("^(?:{source}\n)$")))
            .map_err(|e| Error::invalid_pattern(source, e.to_string()))?;

        Ok(Self {
            source: source.to_string(),
            anchored,
        })
    }

    /// The pattern as written by the user
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Named capture groups of the pattern
    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.anchored.capture_names().flatten()
    }

    /// Whether the whole name matches
    pub fn is_match(&self, name: &str) -> bool {
        self.anchored.is_match(name)
    }

    fn captures<'h>(&self, name: &'h str) -> Option<Captures<'h>> {
        self.anchored.captures(name)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for Pattern {}

// ============================================================================
// Regex (named group) partitioner
// ============================================================================

/// Extracts named capture groups as partition parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegexPartitioner {
    pattern: Pattern,
    param_names: Vec<String>,
    sort_ascending: bool,
}

impl RegexPartitioner {
    fn new(pattern: Pattern, param_names: Vec<String>, sort_ascending: bool) -> Result<Self> {
        let mut seen = std::collections::HashSet::new();
        for name in &param_names {
            if !seen.insert(name.as_str()) {
                return Err(Error::invalid_value(
                    "param_names",
                    format!("duplicate param name '{name}'"),
                ));
            }
        }

        let groups: Vec<&str> = pattern.group_names().collect();
        if let Some(missing) = param_names.iter().find(|p| !groups.contains(&p.as_str())) {
            return Err(Error::invalid_pattern(
                pattern.as_str(),
                format!("no named capture group for param '{missing}'"),
            ));
        }

        Ok(Self {
            pattern,
            param_names,
            sort_ascending,
        })
    }

    fn extract(&self, name: &str) -> Option<PartitionKey> {
        let captures = self.pattern.captures(name)?;
        let mut key = PartitionKey::new();
        for param in &self.param_names {
            // A group that did not participate in the match yields no key
            let value = captures.name(param)?;
            key.insert(param.clone(), value.as_str());
        }
        Some(key)
    }
}

/// Matches paths without extracting parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPartitioner {
    pattern: Pattern,
    sort_ascending: bool,
}

// ============================================================================
// File Partitioner
// ============================================================================

/// Partitioner over file names
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilePartitioner {
    /// `year` extracted from the name
    Yearly(RegexPartitioner),
    /// `year`, `month` extracted from the name
    Monthly(RegexPartitioner),
    /// `year`, `month`, `day` extracted from the name
    Daily(RegexPartitioner),
    /// Whole path as an opaque sort key
    Path(PathPartitioner),
}

impl FilePartitioner {
    /// Create a partitioner of the given kind
    ///
    /// `param_names` defaults to the kind's defaults; it must be absent (or
    /// empty) for [`PartitionerKind::Path`].
    pub fn new(
        kind: PartitionerKind,
        regex: &str,
        param_names: Option<Vec<String>>,
        sort_ascending: bool,
    ) -> Result<Self> {
        let pattern = Pattern::compile(regex)?;

        if kind == PartitionerKind::Path {
            if param_names.as_ref().is_some_and(|p| !p.is_empty()) {
                return Err(Error::invalid_value(
                    "param_names",
                    "path partitioners do not extract params",
                ));
            }
            return Ok(FilePartitioner::Path(PathPartitioner {
                pattern,
                sort_ascending,
            }));
        }

        let param_names = param_names.unwrap_or_else(|| {
            kind.default_param_names()
                .iter()
                .map(ToString::to_string)
                .collect()
        });
        let inner = RegexPartitioner::new(pattern, param_names, sort_ascending)?;

        Ok(match kind {
            PartitionerKind::Yearly => FilePartitioner::Yearly(inner),
            PartitionerKind::Monthly => FilePartitioner::Monthly(inner),
            PartitionerKind::Daily => FilePartitioner::Daily(inner),
            PartitionerKind::Path => unreachable!("handled above"),
        })
    }

    /// Yearly partitioner with default params
    pub fn yearly(regex: &str) -> Result<Self> {
        Self::new(PartitionerKind::Yearly, regex, None, true)
    }

    /// Monthly partitioner with default params
    pub fn monthly(regex: &str) -> Result<Self> {
        Self::new(PartitionerKind::Monthly, regex, None, true)
    }

    /// Daily partitioner with default params
    pub fn daily(regex: &str) -> Result<Self> {
        Self::new(PartitionerKind::Daily, regex, None, true)
    }

    /// Path partitioner
    pub fn path(regex: &str) -> Result<Self> {
        Self::new(PartitionerKind::Path, regex, None, true)
    }

    /// Set the natural sort direction
    #[must_use]
    pub fn with_sort_ascending(mut self, ascending: bool) -> Self {
        match &mut self {
            FilePartitioner::Yearly(p) | FilePartitioner::Monthly(p) | FilePartitioner::Daily(p) => {
                p.sort_ascending = ascending;
            }
            FilePartitioner::Path(p) => p.sort_ascending = ascending,
        }
        self
    }

    /// Variant tag
    pub fn kind(&self) -> PartitionerKind {
        match self {
            FilePartitioner::Yearly(_) => PartitionerKind::Yearly,
            FilePartitioner::Monthly(_) => PartitionerKind::Monthly,
            FilePartitioner::Daily(_) => PartitionerKind::Daily,
            FilePartitioner::Path(_) => PartitionerKind::Path,
        }
    }

    /// The compiled pattern
    pub fn pattern(&self) -> &Pattern {
        match self {
            FilePartitioner::Yearly(p) | FilePartitioner::Monthly(p) | FilePartitioner::Daily(p) => {
                &p.pattern
            }
            FilePartitioner::Path(p) => &p.pattern,
        }
    }

    /// Parameter names extracted, in order
    pub fn param_names(&self) -> &[String] {
        match self {
            FilePartitioner::Yearly(p) | FilePartitioner::Monthly(p) | FilePartitioner::Daily(p) => {
                &p.param_names
            }
            FilePartitioner::Path(_) => &[],
        }
    }

    /// Natural sort direction
    pub fn sort_ascending(&self) -> bool {
        match self {
            FilePartitioner::Yearly(p) | FilePartitioner::Monthly(p) | FilePartitioner::Daily(p) => {
                p.sort_ascending
            }
            FilePartitioner::Path(p) => p.sort_ascending,
        }
    }

    /// Extract a partition key from a name
    ///
    /// Returns `None` when the name does not match; that is the expected
    /// outcome for files that do not belong to the asset.
    pub fn extract(&self, name: &str) -> Option<PartitionKey> {
        match self {
            FilePartitioner::Yearly(p) | FilePartitioner::Monthly(p) | FilePartitioner::Daily(p) => {
                p.extract(name)
            }
            FilePartitioner::Path(p) => p.pattern.is_match(name).then(PartitionKey::new),
        }
    }
}

// ============================================================================
// Column Partitioner
// ============================================================================

/// Splits a SQL relation on the date parts of one column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnPartitioner {
    kind: PartitionerKind,
    column: String,
    param_names: Vec<String>,
    sort_ascending: bool,
}

impl ColumnPartitioner {
    /// Create a column partitioner; the path kind is not valid here
    pub fn new(kind: PartitionerKind, column: &str, sort_ascending: bool) -> Result<Self> {
        if kind == PartitionerKind::Path {
            return Err(Error::invalid_value(
                "partitioner",
                "path partitioners cannot split a SQL column",
            ));
        }
        validate_identifier("column", column)?;

        Ok(Self {
            kind,
            column: column.to_string(),
            param_names: kind
                .default_param_names()
                .iter()
                .map(ToString::to_string)
                .collect(),
            sort_ascending,
        })
    }

    /// Variant tag
    pub fn kind(&self) -> PartitionerKind {
        self.kind
    }

    /// Column being split
    pub fn column(&self) -> &str {
        &self.column
    }

    /// Parameter names, one per date part
    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    /// Natural sort direction
    pub fn sort_ascending(&self) -> bool {
        self.sort_ascending
    }
}

// ============================================================================
// Partitioner
// ============================================================================

/// Any partitioner a batch definition can hold
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Partitioner {
    /// Regex over file names
    File(FilePartitioner),
    /// Date parts of a SQL column
    Column(ColumnPartitioner),
}

impl Partitioner {
    /// Variant tag
    pub fn kind(&self) -> PartitionerKind {
        match self {
            Partitioner::File(p) => p.kind(),
            Partitioner::Column(p) => p.kind(),
        }
    }

    /// Parameter names extracted, in order
    pub fn param_names(&self) -> &[String] {
        match self {
            Partitioner::File(p) => p.param_names(),
            Partitioner::Column(p) => p.param_names(),
        }
    }

    /// Natural sort direction
    pub fn sort_ascending(&self) -> bool {
        match self {
            Partitioner::File(p) => p.sort_ascending(),
            Partitioner::Column(p) => p.sort_ascending(),
        }
    }

    /// Connector family this partitioner can run against
    pub fn family(&self) -> ConnectorFamily {
        match self {
            Partitioner::File(_) => ConnectorFamily::FilePath,
            Partitioner::Column(_) => ConnectorFamily::Sql,
        }
    }

    /// Whether `field` is one of the extracted params
    pub fn has_param(&self, field: &str) -> bool {
        self.param_names().iter().any(|p| p == field)
    }
}

impl From<FilePartitioner> for Partitioner {
    fn from(p: FilePartitioner) -> Self {
        Partitioner::File(p)
    }
}

impl From<ColumnPartitioner> for Partitioner {
    fn from(p: ColumnPartitioner) -> Self {
        Partitioner::Column(p)
    }
}
