//! Request and response types for the administrative RPCs
//!
//! One request type per RPC, mirroring the wire shape: resources are
//! addressed by typed names, list RPCs carry a page token, and the
//! snapshot RPCs that start server-side work answer with an
//! [`Operation`](crate::operation::Operation) instead of their final
//! result.

use crate::consistency::{Consistency, ConsistencyToken};
use crate::names::{ClusterName, InstanceName, OperationName, SnapshotName, TableName};
use crate::snapshot::Snapshot;
use crate::table::{FamilyModification, Table, TableConfig, TableView};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use trellis_core::paginate::Page;

/// Create a new table within an instance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateTableRequest {
    /// Instance that will own the table.
    pub parent: InstanceName,

    /// Id of the table to create, relative to `parent`.
    pub table_id: String,

    /// Schema of the new table.
    #[serde(default)]
    pub config: TableConfig,
}

impl CreateTableRequest {
    /// Create `table_id` under `parent` with the given schema.
    pub fn new(parent: InstanceName, table_id: impl Into<String>, config: TableConfig) -> Self {
        Self {
            parent,
            table_id: table_id.into(),
            config,
        }
    }
}

/// Fetch one table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GetTableRequest {
    /// Table to fetch.
    pub name: TableName,

    /// How much of the table to return.
    #[serde(default)]
    pub view: TableView,
}

impl GetTableRequest {
    /// Fetch `name` at the default schema view.
    pub fn new(name: TableName) -> Self {
        Self {
            name,
            view: TableView::default(),
        }
    }

    /// Ask for a different view.
    pub fn with_view(mut self, view: TableView) -> Self {
        self.view = view;
        self
    }
}

/// Fetch one page of an instance's tables.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListTablesRequest {
    /// Instance whose tables are listed.
    pub parent: InstanceName,

    /// How much of each table to return.
    #[serde(default)]
    pub view: TableView,

    /// Server-chosen page size when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,

    /// Token of the page to fetch; empty for the first page.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub page_token: String,
}

impl ListTablesRequest {
    /// List the tables of `parent`, names only.
    pub fn new(parent: InstanceName) -> Self {
        Self {
            parent,
            view: TableView::NameOnly,
            page_size: None,
            page_token: String::new(),
        }
    }

    /// Ask for a different view.
    pub fn with_view(mut self, view: TableView) -> Self {
        self.view = view;
        self
    }

    /// Resume from `token`.
    pub fn with_page_token(mut self, token: impl Into<String>) -> Self {
        self.page_token = token.into();
        self
    }
}

/// One page of a table listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListTablesPage {
    /// Tables in this page, in server order.
    #[serde(default)]
    pub tables: Vec<Table>,

    /// Token of the next page; empty when this was the last one.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub next_page_token: String,
}

impl Page for ListTablesPage {
    type Item = Table;

    fn next_token(&self) -> &str {
        &self.next_page_token
    }

    fn into_items(self) -> Vec<Table> {
        self.tables
    }
}

/// Delete one table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeleteTableRequest {
    /// Table to delete.
    pub name: TableName,
}

impl DeleteTableRequest {
    /// Delete `name`.
    pub fn new(name: TableName) -> Self {
        Self { name }
    }
}

/// Atomically apply a sequence of column family changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModifyColumnFamiliesRequest {
    /// Table whose families are modified.
    pub name: TableName,

    /// Changes, applied in order.
    pub modifications: Vec<FamilyModification>,
}

impl ModifyColumnFamiliesRequest {
    /// Apply `modifications` to `name`.
    pub fn new(name: TableName, modifications: Vec<FamilyModification>) -> Self {
        Self {
            name,
            modifications,
        }
    }
}

/// Which rows a drop request removes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DropRowsTarget {
    /// Rows whose key starts with this prefix.
    RowKeyPrefix(Vec<u8>),

    /// Every row in the table.
    AllRows,
}

/// Delete a range of rows from a table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DropRowRangeRequest {
    /// Table to delete rows from.
    pub name: TableName,

    /// Which rows to delete.
    pub target: DropRowsTarget,
}

impl DropRowRangeRequest {
    /// Delete the rows of `name` whose key starts with `prefix`.
    pub fn by_prefix(name: TableName, prefix: impl Into<Vec<u8>>) -> Self {
        Self {
            name,
            target: DropRowsTarget::RowKeyPrefix(prefix.into()),
        }
    }

    /// Delete every row of `name`.
    pub fn all_rows(name: TableName) -> Self {
        Self {
            name,
            target: DropRowsTarget::AllRows,
        }
    }
}

/// Restore a snapshot into a new table. Answered with an operation whose
/// result is the new [`Table`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateTableFromSnapshotRequest {
    /// Instance that will own the new table.
    pub parent: InstanceName,

    /// Id of the table to create, relative to `parent`.
    pub table_id: String,

    /// Snapshot to restore from.
    pub source_snapshot: SnapshotName,
}

impl CreateTableFromSnapshotRequest {
    /// Restore `source_snapshot` into `table_id` under `parent`.
    pub fn new(
        parent: InstanceName,
        table_id: impl Into<String>,
        source_snapshot: SnapshotName,
    ) -> Self {
        Self {
            parent,
            table_id: table_id.into(),
            source_snapshot,
        }
    }
}

/// Mint a consistency token for a table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenerateConsistencyTokenRequest {
    /// Table the token is minted for.
    pub name: TableName,
}

impl GenerateConsistencyTokenRequest {
    /// Mint a token for `name`.
    pub fn new(name: TableName) -> Self {
        Self { name }
    }
}

/// Answer to a token mint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenerateConsistencyTokenResponse {
    /// The minted token.
    pub consistency_token: ConsistencyToken,
}

/// Ask whether replication has caught up to a token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckConsistencyRequest {
    /// Table the token belongs to.
    pub name: TableName,

    /// Token minted by a prior generate call.
    pub consistency_token: ConsistencyToken,
}

impl CheckConsistencyRequest {
    /// Check `token` against `name`.
    pub fn new(name: TableName, consistency_token: ConsistencyToken) -> Self {
        Self {
            name,
            consistency_token,
        }
    }
}

/// Answer to a consistency check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckConsistencyResponse {
    /// Whether every cluster has caught up.
    pub consistent: bool,
}

impl CheckConsistencyResponse {
    /// The answer as a [`Consistency`].
    pub fn consistency(&self) -> Consistency {
        if self.consistent {
            Consistency::Consistent
        } else {
            Consistency::Inconsistent
        }
    }
}

/// Snapshot a table into a cluster. Answered with an operation whose
/// result is the new [`Snapshot`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SnapshotTableRequest {
    /// Table to snapshot.
    pub name: TableName,

    /// Cluster that will store the snapshot.
    pub cluster: ClusterName,

    /// Id of the snapshot to create, relative to `cluster`.
    pub snapshot_id: String,

    /// How long the server keeps the snapshot; server default when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<Duration>,

    /// Free-form description stored with the snapshot.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl SnapshotTableRequest {
    /// Snapshot `name` into `cluster` as `snapshot_id`.
    pub fn new(name: TableName, cluster: ClusterName, snapshot_id: impl Into<String>) -> Self {
        Self {
            name,
            cluster,
            snapshot_id: snapshot_id.into(),
            ttl: None,
            description: String::new(),
        }
    }

    /// Let the server delete the snapshot after `ttl`.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Attach a description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Full name of the snapshot this request creates.
    pub fn snapshot_name(&self) -> trellis_core::Result<SnapshotName> {
        self.cluster.snapshot(self.snapshot_id.clone())
    }
}

/// Fetch one snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GetSnapshotRequest {
    /// Snapshot to fetch.
    pub name: SnapshotName,
}

impl GetSnapshotRequest {
    /// Fetch `name`.
    pub fn new(name: SnapshotName) -> Self {
        Self { name }
    }
}

/// Fetch one page of a cluster's snapshots.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListSnapshotsRequest {
    /// Cluster whose snapshots are listed.
    pub parent: ClusterName,

    /// Server-chosen page size when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,

    /// Token of the page to fetch; empty for the first page.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub page_token: String,
}

impl ListSnapshotsRequest {
    /// List the snapshots of `parent`.
    pub fn new(parent: ClusterName) -> Self {
        Self {
            parent,
            page_size: None,
            page_token: String::new(),
        }
    }

    /// Resume from `token`.
    pub fn with_page_token(mut self, token: impl Into<String>) -> Self {
        self.page_token = token.into();
        self
    }
}

/// One page of a snapshot listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListSnapshotsPage {
    /// Snapshots in this page, in server order.
    #[serde(default)]
    pub snapshots: Vec<Snapshot>,

    /// Token of the next page; empty when this was the last one.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub next_page_token: String,
}

impl Page for ListSnapshotsPage {
    type Item = Snapshot;

    fn next_token(&self) -> &str {
        &self.next_page_token
    }

    fn into_items(self) -> Vec<Snapshot> {
        self.snapshots
    }
}

/// Delete one snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeleteSnapshotRequest {
    /// Snapshot to delete.
    pub name: SnapshotName,
}

impl DeleteSnapshotRequest {
    /// Delete `name`.
    pub fn new(name: SnapshotName) -> Self {
        Self { name }
    }
}

/// Fetch the current state of a long-running operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GetOperationRequest {
    /// Operation to check.
    pub name: OperationName,
}

impl GetOperationRequest {
    /// Check `name`.
    pub fn new(name: OperationName) -> Self {
        Self { name }
    }
}
