//! The transport seam between the admin client and the Trellis service.
//!
//! [`AdminConnection`] is the only thing the client needs from a
//! transport: one synchronous, single-attempt method per RPC. Retries,
//! pagination, and operation polling all live above this trait, so an
//! implementation should send exactly one request per call and report
//! the outcome as-is. Applications provide the real wire transport;
//! tests substitute a mock.

use std::fmt;

use trellis_core::Result;
use trellis_core::metadata::CallMetadata;
use trellis_protocol::{
    CheckConsistencyRequest, CheckConsistencyResponse, CreateTableFromSnapshotRequest,
    CreateTableRequest, DeleteSnapshotRequest, DeleteTableRequest, DropRowRangeRequest,
    GenerateConsistencyTokenRequest, GenerateConsistencyTokenResponse, GetOperationRequest,
    GetSnapshotRequest, GetTableRequest, ListSnapshotsPage, ListSnapshotsRequest, ListTablesPage,
    ListTablesRequest, ModifyColumnFamiliesRequest, Operation, Snapshot, SnapshotTableRequest,
    Table,
};

/// One attempt of each administrative RPC.
///
/// Every method makes a single attempt and returns the remote outcome
/// (or a local failure) without retrying. The `metadata` argument
/// carries the routing parameter and the invocation id shared by all
/// attempts of one logical operation; implementations should attach it
/// to the outgoing request.
///
/// Implementations must be safe to share across threads; the async
/// entry points invoke them from whichever thread runs the completion
/// queue.
pub trait AdminConnection: Send + Sync + fmt::Debug {
    /// Create a new table in an instance.
    fn create_table(
        &self,
        metadata: &CallMetadata,
        request: &CreateTableRequest,
    ) -> Result<Table>;

    /// Fetch a table's metadata at the requested view.
    fn get_table(&self, metadata: &CallMetadata, request: &GetTableRequest) -> Result<Table>;

    /// Fetch one page of an instance's tables.
    fn list_tables(
        &self,
        metadata: &CallMetadata,
        request: &ListTablesRequest,
    ) -> Result<ListTablesPage>;

    /// Permanently delete a table.
    fn delete_table(&self, metadata: &CallMetadata, request: &DeleteTableRequest) -> Result<()>;

    /// Apply a sequence of column family changes to a table.
    fn modify_column_families(
        &self,
        metadata: &CallMetadata,
        request: &ModifyColumnFamiliesRequest,
    ) -> Result<Table>;

    /// Delete a contiguous range of rows from a table.
    fn drop_row_range(
        &self,
        metadata: &CallMetadata,
        request: &DropRowRangeRequest,
    ) -> Result<()>;

    /// Mint a token for a later consistency check.
    fn generate_consistency_token(
        &self,
        metadata: &CallMetadata,
        request: &GenerateConsistencyTokenRequest,
    ) -> Result<GenerateConsistencyTokenResponse>;

    /// Ask whether replication has caught up with a token.
    fn check_consistency(
        &self,
        metadata: &CallMetadata,
        request: &CheckConsistencyRequest,
    ) -> Result<CheckConsistencyResponse>;

    /// Start taking a snapshot of a table; returns the operation handle.
    fn snapshot_table(
        &self,
        metadata: &CallMetadata,
        request: &SnapshotTableRequest,
    ) -> Result<Operation>;

    /// Fetch a snapshot's metadata.
    fn get_snapshot(
        &self,
        metadata: &CallMetadata,
        request: &GetSnapshotRequest,
    ) -> Result<Snapshot>;

    /// Fetch one page of a cluster's snapshots.
    fn list_snapshots(
        &self,
        metadata: &CallMetadata,
        request: &ListSnapshotsRequest,
    ) -> Result<ListSnapshotsPage>;

    /// Permanently delete a snapshot.
    fn delete_snapshot(
        &self,
        metadata: &CallMetadata,
        request: &DeleteSnapshotRequest,
    ) -> Result<()>;

    /// Start restoring a snapshot into a new table; returns the
    /// operation handle.
    fn create_table_from_snapshot(
        &self,
        metadata: &CallMetadata,
        request: &CreateTableFromSnapshotRequest,
    ) -> Result<Operation>;

    /// Fetch the current state of a long-running operation.
    fn get_operation(
        &self,
        metadata: &CallMetadata,
        request: &GetOperationRequest,
    ) -> Result<Operation>;
}
