//! Shared domain types for the Trellis administrative API
//!
//! This crate holds the types the admin client and its callers exchange:
//! validated resource names, table and snapshot schemas, long-running
//! operation handles, and one request/response pair per administrative
//! RPC. Centralizing them keeps the client crate free of wire-shape
//! concerns and gives tests a single vocabulary for building fixtures.
//!
//! # Type Organization
//!
//! - **Resource names**: [`names`] - validated `instances/...` paths
//! - **Table schema**: [`table`] - tables, column families, GC rules
//! - **Snapshots**: [`snapshot`] - frozen table copies and their lifecycle
//! - **Operations**: [`operation`] - long-running operation handles
//! - **Consistency**: [`consistency`] - replication catch-up markers
//! - **RPC shapes**: [`requests`] - request/response types per RPC
//!
//! # Design Principles
//!
//! - **Zero I/O**: all types are pure data structures
//! - **Validate at the edge**: names are checked once, at construction
//! - **Serialization**: serde-based, JSON today
//! - **Errors upstream**: failures use `trellis_core::Error`, so callers
//!   see one taxonomy end to end

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod consistency;
pub mod names;
pub mod operation;
pub mod requests;
pub mod snapshot;
pub mod table;

// Re-export commonly used types at crate level
pub use consistency::{Consistency, ConsistencyToken};
pub use names::{ClusterName, InstanceName, OperationName, SnapshotName, TableName};
pub use operation::{Operation, OperationResult};
pub use requests::{
    CheckConsistencyRequest, CheckConsistencyResponse, CreateTableFromSnapshotRequest,
    CreateTableRequest, DeleteSnapshotRequest, DeleteTableRequest, DropRowRangeRequest,
    DropRowsTarget, GenerateConsistencyTokenRequest, GenerateConsistencyTokenResponse,
    GetOperationRequest, GetSnapshotRequest, GetTableRequest, ListSnapshotsPage,
    ListSnapshotsRequest, ListTablesPage, ListTablesRequest, ModifyColumnFamiliesRequest,
    SnapshotTableRequest,
};
pub use snapshot::{Snapshot, SnapshotState};
pub use table::{
    ColumnFamily, FamilyModification, GcRule, Table, TableConfig, TableView,
    TimestampGranularity,
};
