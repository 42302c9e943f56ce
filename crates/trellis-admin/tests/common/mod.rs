//! Common test fixtures: a mock connection and fast, deterministic
//! client configurations.

#![allow(dead_code)]

use std::time::Duration;

use trellis_admin::{AdminConfig, AdminConnection, TableAdmin};
use trellis_core::metadata::CallMetadata;
use trellis_core::{Error, Result, StatusCode};
use trellis_protocol::{
    CheckConsistencyRequest, CheckConsistencyResponse, ClusterName, CreateTableFromSnapshotRequest,
    CreateTableRequest, DeleteSnapshotRequest, DeleteTableRequest, DropRowRangeRequest,
    GenerateConsistencyTokenRequest, GenerateConsistencyTokenResponse, GetOperationRequest,
    GetSnapshotRequest, GetTableRequest, InstanceName, ListSnapshotsPage, ListSnapshotsRequest,
    ListTablesPage, ListTablesRequest, ModifyColumnFamiliesRequest, Operation, OperationName,
    Snapshot, SnapshotName, SnapshotTableRequest, Table, TableName,
};

mockall::mock! {
    #[derive(Debug)]
    pub Connection {}

    impl AdminConnection for Connection {
        fn create_table(
            &self,
            metadata: &CallMetadata,
            request: &CreateTableRequest,
        ) -> Result<Table>;
        fn get_table(&self, metadata: &CallMetadata, request: &GetTableRequest) -> Result<Table>;
        fn list_tables(
            &self,
            metadata: &CallMetadata,
            request: &ListTablesRequest,
        ) -> Result<ListTablesPage>;
        fn delete_table(
            &self,
            metadata: &CallMetadata,
            request: &DeleteTableRequest,
        ) -> Result<()>;
        fn modify_column_families(
            &self,
            metadata: &CallMetadata,
            request: &ModifyColumnFamiliesRequest,
        ) -> Result<Table>;
        fn drop_row_range(
            &self,
            metadata: &CallMetadata,
            request: &DropRowRangeRequest,
        ) -> Result<()>;
        fn generate_consistency_token(
            &self,
            metadata: &CallMetadata,
            request: &GenerateConsistencyTokenRequest,
        ) -> Result<GenerateConsistencyTokenResponse>;
        fn check_consistency(
            &self,
            metadata: &CallMetadata,
            request: &CheckConsistencyRequest,
        ) -> Result<CheckConsistencyResponse>;
        fn snapshot_table(
            &self,
            metadata: &CallMetadata,
            request: &SnapshotTableRequest,
        ) -> Result<Operation>;
        fn get_snapshot(
            &self,
            metadata: &CallMetadata,
            request: &GetSnapshotRequest,
        ) -> Result<Snapshot>;
        fn list_snapshots(
            &self,
            metadata: &CallMetadata,
            request: &ListSnapshotsRequest,
        ) -> Result<ListSnapshotsPage>;
        fn delete_snapshot(
            &self,
            metadata: &CallMetadata,
            request: &DeleteSnapshotRequest,
        ) -> Result<()>;
        fn create_table_from_snapshot(
            &self,
            metadata: &CallMetadata,
            request: &CreateTableFromSnapshotRequest,
        ) -> Result<Operation>;
        fn get_operation(
            &self,
            metadata: &CallMetadata,
            request: &GetOperationRequest,
        ) -> Result<Operation>;
    }
}

pub fn instance() -> InstanceName {
    InstanceName::new("prod").unwrap()
}

pub fn table_name() -> TableName {
    TableName::new("prod", "events").unwrap()
}

pub fn cluster_name() -> ClusterName {
    ClusterName::new("prod", "c1").unwrap()
}

pub fn snapshot_name() -> SnapshotName {
    SnapshotName::new("prod", "c1", "nightly").unwrap()
}

pub fn operation_name() -> OperationName {
    OperationName::new("op-1").unwrap()
}

pub fn transient() -> Error {
    Error::rpc(StatusCode::Unavailable, "try again")
}

pub fn permanent() -> Error {
    Error::rpc(StatusCode::PermissionDenied, "caller is not allowed")
}

/// Three attempts, fixed 10ms backoff, generous polling budget with 5ms
/// between checks. Everything a test needs to observe retry behavior
/// without waiting on production-sized delays.
pub fn fast_config() -> AdminConfig {
    AdminConfig::builder()
        .max_attempts(3)
        .initial_backoff(Duration::from_millis(10))
        .max_backoff(Duration::from_millis(10))
        .backoff_jitter(0.0)
        .poll_deadline(Duration::from_secs(5))
        .initial_poll_delay(Duration::from_millis(5))
        .max_poll_delay(Duration::from_millis(5))
        .build()
}

/// A client over `connection` with the fast test configuration.
pub fn admin(connection: MockConnection) -> TableAdmin {
    admin_with_config(connection, fast_config())
}

pub fn admin_with_config(connection: MockConnection, config: AdminConfig) -> TableAdmin {
    TableAdmin::builder(connection, instance())
        .config(config)
        .build()
}

/// Strip context wrappers to reach the failure underneath.
pub fn root(error: &Error) -> &Error {
    match error {
        Error::WithContext { source, .. } => root(source),
        other => other,
    }
}
