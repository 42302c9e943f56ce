//! Table operations.

use tracing::{info, warn};

use trellis_core::Result;
use trellis_core::adapter::{OperationFuture, execute_polled_async, list_all_async};
use trellis_core::idempotency::Idempotency;
use trellis_core::lro::execute_polled;
use trellis_core::metadata::CallMetadata;
use trellis_core::paginate::list_all;
use trellis_core::queue::CompletionQueue;
use trellis_protocol::{
    CreateTableFromSnapshotRequest, CreateTableRequest, DeleteTableRequest, DropRowRangeRequest,
    GetOperationRequest, GetTableRequest, ListTablesRequest, ModifyColumnFamiliesRequest,
    OperationName, Table, TableName,
};

use super::{Resource, call, call_async};
use crate::client::TableAdmin;

/// Table operations for one instance.
///
/// Reached through [`TableAdmin::tables`].
#[derive(Clone)]
pub struct Tables {
    admin: TableAdmin,
}

impl Tables {
    pub(crate) fn new(admin: TableAdmin) -> Self {
        Self { admin }
    }

    /// Create a new table.
    ///
    /// Creation is declared non-idempotent: under the default mutation
    /// mode a transient failure is returned after a single attempt,
    /// because the server may have created the table before the
    /// connection broke.
    #[tracing::instrument(skip(self, request), fields(instance = %request.parent, table = %request.table_id))]
    pub fn create(&self, request: CreateTableRequest) -> Result<Table> {
        let metadata = CallMetadata::parent(request.parent.to_string());
        let connection = self.admin.connection();

        let result = call(&self.admin, Idempotency::NonIdempotent, &metadata, || {
            connection.create_table(&metadata, &request)
        });

        match &result {
            Ok(table) => info!(table = %table.name, "Table created"),
            Err(error) => warn!(error = %error, "Table creation failed"),
        }
        result.map_err(|error| {
            error.context(format!(
                "creating table {} in {}",
                request.table_id, request.parent
            ))
        })
    }

    /// Fetch a table's metadata at the requested view.
    pub fn get(&self, request: GetTableRequest) -> Result<Table> {
        let metadata = CallMetadata::name(request.name.to_string());
        let connection = self.admin.connection();

        call(&self.admin, Idempotency::Idempotent, &metadata, || {
            connection.get_table(&metadata, &request)
        })
        .map_err(|error| error.context(format!("fetching table {}", request.name)))
    }

    /// List every table in the instance, walking all pages.
    ///
    /// A page token already present in the request selects the starting
    /// page; pagination proceeds from there.
    pub fn list(&self, request: ListTablesRequest) -> Result<Vec<Table>> {
        let metadata = CallMetadata::parent(request.parent.to_string());
        let connection = self.admin.connection();

        list_all(
            self.admin.retry_prototype(),
            self.admin.backoff_prototype(),
            std::thread::sleep,
            |token| {
                let mut page_request = request.clone();
                if !token.is_empty() {
                    page_request.page_token = token.to_string();
                }
                connection.list_tables(&metadata, &page_request)
            },
        )
        .map_err(|error| error.context(format!("listing tables in {}", request.parent)))
    }

    /// Permanently delete a table.
    ///
    /// Deletion is idempotent: repeating it cannot delete the table
    /// twice, so transient failures are retried.
    pub fn delete(&self, request: DeleteTableRequest) -> Result<()> {
        let metadata = CallMetadata::name(request.name.to_string());
        let connection = self.admin.connection();

        call(&self.admin, Idempotency::Idempotent, &metadata, || {
            connection.delete_table(&metadata, &request)
        })
        .map_err(|error| error.context(format!("deleting table {}", request.name)))
    }

    /// Apply a sequence of column family changes atomically.
    ///
    /// Declared non-idempotent: a replayed `Drop` of an already-dropped
    /// family fails, and creates may half-apply.
    pub fn modify_column_families(&self, request: ModifyColumnFamiliesRequest) -> Result<Table> {
        let metadata = CallMetadata::name(request.name.to_string());
        let connection = self.admin.connection();

        call(&self.admin, Idempotency::NonIdempotent, &metadata, || {
            connection.modify_column_families(&metadata, &request)
        })
        .map_err(|error| {
            error.context(format!("modifying column families of {}", request.name))
        })
    }

    /// Delete every row whose key starts with `prefix`.
    #[tracing::instrument(skip(self, name, prefix), fields(table = %name))]
    pub fn drop_rows_by_prefix(&self, name: TableName, prefix: impl Into<Vec<u8>>) -> Result<()> {
        let request = DropRowRangeRequest::by_prefix(name, prefix);
        self.drop_row_range(request)
    }

    /// Delete every row in the table.
    #[tracing::instrument(skip(self, name), fields(table = %name))]
    pub fn drop_all_rows(&self, name: TableName) -> Result<()> {
        let request = DropRowRangeRequest::all_rows(name);
        self.drop_row_range(request)
    }

    fn drop_row_range(&self, request: DropRowRangeRequest) -> Result<()> {
        let metadata = CallMetadata::name(request.name.to_string());
        let connection = self.admin.connection();

        call(&self.admin, Idempotency::NonIdempotent, &metadata, || {
            connection.drop_row_range(&metadata, &request)
        })
        .map_err(|error| error.context(format!("dropping rows from {}", request.name)))
    }

    /// Restore a snapshot into a new table, waiting for the restore to
    /// finish.
    ///
    /// The initiating call names the new table, so repeating it is safe
    /// and transient failures are retried. Once the server accepts the
    /// restore, its operation handle is polled until the table is ready
    /// or the polling budget runs out.
    #[tracing::instrument(skip(self, request), fields(snapshot = %request.source_snapshot, table = %request.table_id))]
    pub fn create_from_snapshot(&self, request: CreateTableFromSnapshotRequest) -> Result<Table> {
        let table_name = request.parent.table(&request.table_id)?;
        let metadata = CallMetadata::parent(request.parent.to_string());
        let connection = self.admin.connection();

        let mut retry = self.admin.retry_prototype().clone_policy();
        let mut backoff = self.admin.backoff_prototype().clone_policy();
        let mut polling = self.admin.polling_prototype().clone_policy();
        let mut attempts = 0u32;
        let mut poll_metadata: Option<CallMetadata> = None;

        let result = execute_polled(
            &table_name.to_string(),
            self.admin.effective(Idempotency::Idempotent),
            retry.as_mut(),
            backoff.as_mut(),
            polling.as_mut(),
            std::thread::sleep,
            || {
                attempts += 1;
                metadata.log_attempt(attempts);
                connection
                    .create_table_from_snapshot(&metadata, &request)?
                    .into_started()
            },
            |operation: &OperationName| {
                let poll_metadata =
                    poll_metadata.get_or_insert_with(|| CallMetadata::name(operation.to_string()));
                connection
                    .get_operation(poll_metadata, &GetOperationRequest::new(operation.clone()))?
                    .into_poll_result()
            },
        );

        match &result {
            Ok(_) => info!(table = %table_name, "Table restored from snapshot"),
            Err(error) => warn!(error = %error, "Restore from snapshot failed"),
        }
        result.map_err(|error| {
            error.context(format!(
                "restoring {} into {}",
                request.source_snapshot, table_name
            ))
        })
    }

    /// Create a new table without blocking; see [`create`](Self::create).
    pub fn create_async(
        &self,
        queue: &CompletionQueue,
        request: CreateTableRequest,
    ) -> OperationFuture<Table> {
        let metadata = CallMetadata::parent(request.parent.to_string());
        let connection = self.admin.connection().clone();

        call_async(
            &self.admin,
            queue,
            Idempotency::NonIdempotent,
            metadata.clone(),
            move || connection.create_table(&metadata, &request),
        )
    }

    /// Fetch a table without blocking; see [`get`](Self::get).
    pub fn get_async(
        &self,
        queue: &CompletionQueue,
        request: GetTableRequest,
    ) -> OperationFuture<Table> {
        let metadata = CallMetadata::name(request.name.to_string());
        let connection = self.admin.connection().clone();

        call_async(
            &self.admin,
            queue,
            Idempotency::Idempotent,
            metadata.clone(),
            move || connection.get_table(&metadata, &request),
        )
    }

    /// List every table without blocking; see [`list`](Self::list).
    pub fn list_async(
        &self,
        queue: &CompletionQueue,
        request: ListTablesRequest,
    ) -> OperationFuture<Vec<Table>> {
        let metadata = CallMetadata::parent(request.parent.to_string());
        let connection = self.admin.connection().clone();

        list_all_async(
            queue,
            self.admin.retry_prototype().clone_policy(),
            self.admin.backoff_prototype().clone_policy(),
            move |token| {
                let mut page_request = request.clone();
                if !token.is_empty() {
                    page_request.page_token = token.to_string();
                }
                connection.list_tables(&metadata, &page_request)
            },
        )
    }

    /// Delete a table without blocking; see [`delete`](Self::delete).
    pub fn delete_async(
        &self,
        queue: &CompletionQueue,
        request: DeleteTableRequest,
    ) -> OperationFuture<()> {
        let metadata = CallMetadata::name(request.name.to_string());
        let connection = self.admin.connection().clone();

        call_async(
            &self.admin,
            queue,
            Idempotency::Idempotent,
            metadata.clone(),
            move || connection.delete_table(&metadata, &request),
        )
    }

    /// Change column families without blocking; see
    /// [`modify_column_families`](Self::modify_column_families).
    pub fn modify_column_families_async(
        &self,
        queue: &CompletionQueue,
        request: ModifyColumnFamiliesRequest,
    ) -> OperationFuture<Table> {
        let metadata = CallMetadata::name(request.name.to_string());
        let connection = self.admin.connection().clone();

        call_async(
            &self.admin,
            queue,
            Idempotency::NonIdempotent,
            metadata.clone(),
            move || connection.modify_column_families(&metadata, &request),
        )
    }

    /// Drop rows by key prefix without blocking; see
    /// [`drop_rows_by_prefix`](Self::drop_rows_by_prefix).
    pub fn drop_rows_by_prefix_async(
        &self,
        queue: &CompletionQueue,
        name: TableName,
        prefix: impl Into<Vec<u8>>,
    ) -> OperationFuture<()> {
        self.drop_row_range_async(queue, DropRowRangeRequest::by_prefix(name, prefix))
    }

    /// Drop every row without blocking; see
    /// [`drop_all_rows`](Self::drop_all_rows).
    pub fn drop_all_rows_async(
        &self,
        queue: &CompletionQueue,
        name: TableName,
    ) -> OperationFuture<()> {
        self.drop_row_range_async(queue, DropRowRangeRequest::all_rows(name))
    }

    fn drop_row_range_async(
        &self,
        queue: &CompletionQueue,
        request: DropRowRangeRequest,
    ) -> OperationFuture<()> {
        let metadata = CallMetadata::name(request.name.to_string());
        let connection = self.admin.connection().clone();

        call_async(
            &self.admin,
            queue,
            Idempotency::NonIdempotent,
            metadata.clone(),
            move || connection.drop_row_range(&metadata, &request),
        )
    }

    /// Restore a snapshot into a new table without blocking; see
    /// [`create_from_snapshot`](Self::create_from_snapshot).
    pub fn create_from_snapshot_async(
        &self,
        queue: &CompletionQueue,
        request: CreateTableFromSnapshotRequest,
    ) -> OperationFuture<Table> {
        let table_name = match request.parent.table(&request.table_id) {
            Ok(name) => name,
            Err(error) => return OperationFuture::ready(Err(error)),
        };
        let metadata = CallMetadata::parent(request.parent.to_string());
        let connection = self.admin.connection().clone();
        let poll_connection = connection.clone();
        let mut attempts = 0u32;
        let mut poll_metadata: Option<CallMetadata> = None;

        execute_polled_async(
            queue,
            table_name.to_string(),
            self.admin.effective(Idempotency::Idempotent),
            self.admin.retry_prototype().clone_policy(),
            self.admin.backoff_prototype().clone_policy(),
            self.admin.polling_prototype().clone_policy(),
            move || {
                attempts += 1;
                metadata.log_attempt(attempts);
                connection
                    .create_table_from_snapshot(&metadata, &request)?
                    .into_started()
            },
            move |operation: &OperationName| {
                let poll_metadata =
                    poll_metadata.get_or_insert_with(|| CallMetadata::name(operation.to_string()));
                poll_connection
                    .get_operation(poll_metadata, &GetOperationRequest::new(operation.clone()))?
                    .into_poll_result()
            },
        )
    }
}

impl Resource for Tables {
    fn admin(&self) -> &TableAdmin {
        &self.admin
    }
}
