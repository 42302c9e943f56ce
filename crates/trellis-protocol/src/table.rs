//! Table schema types
//!
//! A table is a named collection of column families; each family carries a
//! garbage-collection rule deciding which cells the server may expire.
//! These types mirror the administrative API's view of a table, not its
//! data-plane contents.

use crate::names::TableName;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Garbage-collection rule for the cells of one column family.
///
/// Rules nest: an intersection keeps a cell only while every child rule
/// would, a union keeps it while any child rule would.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GcRule {
    /// Keep at most this many versions of each cell.
    MaxNumVersions(u32),

    /// Expire cells older than this age.
    MaxAge(Duration),

    /// Keep cells only while all nested rules keep them.
    Intersection(Vec<GcRule>),

    /// Keep cells while any nested rule keeps them.
    Union(Vec<GcRule>),
}

impl GcRule {
    /// Keep at most `n` versions of each cell.
    pub fn max_num_versions(n: u32) -> Self {
        GcRule::MaxNumVersions(n)
    }

    /// Expire cells older than `age`.
    pub fn max_age(age: Duration) -> Self {
        GcRule::MaxAge(age)
    }

    /// Keep cells only while all of `rules` keep them.
    pub fn intersection(rules: impl IntoIterator<Item = GcRule>) -> Self {
        GcRule::Intersection(rules.into_iter().collect())
    }

    /// Keep cells while any of `rules` keeps them.
    pub fn union(rules: impl IntoIterator<Item = GcRule>) -> Self {
        GcRule::Union(rules.into_iter().collect())
    }
}

/// One column family within a table.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColumnFamily {
    /// Garbage-collection rule for this family's cells, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gc_rule: Option<GcRule>,
}

impl ColumnFamily {
    /// A family governed by `rule`.
    pub fn new(rule: GcRule) -> Self {
        Self {
            gc_rule: Some(rule),
        }
    }
}

/// Granularity of cell timestamps within a table.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TimestampGranularity {
    /// The server picks its default granularity.
    #[default]
    Unspecified,

    /// Timestamps are rounded to milliseconds.
    Millis,
}

/// How much of a table the server should return on get and list.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TableView {
    /// Only the table's name.
    NameOnly,

    /// Name plus column family schema.
    #[default]
    Schema,

    /// Everything the server knows about the table.
    Full,
}

/// A table as reported by the administrative API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Table {
    /// Full resource name of the table.
    pub name: TableName,

    /// Column families keyed by family name. Empty under
    /// [`TableView::NameOnly`].
    #[serde(default)]
    pub column_families: BTreeMap<String, ColumnFamily>,

    /// Timestamp granularity for cells in this table.
    #[serde(default)]
    pub granularity: TimestampGranularity,
}

impl Table {
    /// A table with no declared column families.
    pub fn new(name: TableName) -> Self {
        Self {
            name,
            column_families: BTreeMap::new(),
            granularity: TimestampGranularity::default(),
        }
    }

    /// Add a column family governed by `rule`.
    pub fn with_column_family(mut self, family: impl Into<String>, rule: GcRule) -> Self {
        self.column_families
            .insert(family.into(), ColumnFamily::new(rule));
        self
    }
}

/// Schema for a table to be created.
///
/// Initial splits pre-shard the new table at the given row keys so a bulk
/// load does not funnel through a single tablet.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TableConfig {
    /// Column families to create, keyed by family name.
    #[serde(default)]
    pub column_families: BTreeMap<String, GcRule>,

    /// Row keys at which the new table is split into tablets.
    #[serde(default)]
    pub initial_splits: Vec<String>,

    /// Timestamp granularity for the new table.
    #[serde(default)]
    pub granularity: TimestampGranularity,
}

impl TableConfig {
    /// A config with no families and no splits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a column family governed by `rule`.
    pub fn with_column_family(mut self, family: impl Into<String>, rule: GcRule) -> Self {
        self.column_families.insert(family.into(), rule);
        self
    }

    /// Add an initial split point.
    pub fn with_split(mut self, row_key: impl Into<String>) -> Self {
        self.initial_splits.push(row_key.into());
        self
    }
}

/// One change to a table's column families.
///
/// A modify request carries a list of these; the server applies them in
/// order and atomically.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FamilyModification {
    /// Create a new family governed by `rule`.
    Create {
        /// Name of the family to create.
        id: String,
        /// Garbage-collection rule for the new family.
        rule: GcRule,
    },

    /// Replace an existing family's garbage-collection rule.
    Update {
        /// Name of the family to update.
        id: String,
        /// The family's new garbage-collection rule.
        rule: GcRule,
    },

    /// Delete a family and all of its cells.
    Drop {
        /// Name of the family to delete.
        id: String,
    },
}

impl FamilyModification {
    /// Create the family `id` governed by `rule`.
    pub fn create(id: impl Into<String>, rule: GcRule) -> Self {
        FamilyModification::Create {
            id: id.into(),
            rule,
        }
    }

    /// Replace the rule of the existing family `id`.
    pub fn update(id: impl Into<String>, rule: GcRule) -> Self {
        FamilyModification::Update {
            id: id.into(),
            rule,
        }
    }

    /// Delete the family `id`.
    pub fn drop(id: impl Into<String>) -> Self {
        FamilyModification::Drop { id: id.into() }
    }

    /// Name of the family this modification touches.
    pub fn id(&self) -> &str {
        match self {
            FamilyModification::Create { id, .. }
            | FamilyModification::Update { id, .. }
            | FamilyModification::Drop { id } => id,
        }
    }
}
