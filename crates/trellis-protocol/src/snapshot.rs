//! Snapshot types
//!
//! A snapshot is a frozen copy of a table, taken within one cluster. The
//! server creates and restores snapshots asynchronously, so the RPCs that
//! produce them return long-running operations rather than these types
//! directly.

use crate::names::{SnapshotName, TableName};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a snapshot.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotState {
    /// The server has not reported a state.
    #[default]
    Unknown,

    /// The snapshot is still being written.
    Creating,

    /// The snapshot is complete and may be restored from.
    Ready,
}

/// A snapshot as reported by the administrative API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Snapshot {
    /// Full resource name of the snapshot.
    pub name: SnapshotName,

    /// The table this snapshot was taken from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_table: Option<TableName>,

    /// Size of the snapshot's data, in bytes.
    #[serde(default)]
    pub data_size_bytes: i64,

    /// When the snapshot was created.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_time: Option<DateTime<Utc>>,

    /// When the server will delete the snapshot, if a TTL was set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete_time: Option<DateTime<Utc>>,

    /// Free-form description supplied at creation.
    #[serde(default)]
    pub description: String,

    /// Lifecycle state.
    #[serde(default)]
    pub state: SnapshotState,
}

impl Snapshot {
    /// A snapshot with only its name set.
    pub fn new(name: SnapshotName) -> Self {
        Self {
            name,
            source_table: None,
            data_size_bytes: 0,
            create_time: None,
            delete_time: None,
            description: String::new(),
            state: SnapshotState::default(),
        }
    }

    /// Set the source table.
    pub fn with_source_table(mut self, table: TableName) -> Self {
        self.source_table = Some(table);
        self
    }

    /// Set the lifecycle state.
    pub fn with_state(mut self, state: SnapshotState) -> Self {
        self.state = state;
        self
    }
}
