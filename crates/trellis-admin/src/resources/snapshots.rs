//! Snapshot operations.

use tracing::{info, warn};

use trellis_core::Result;
use trellis_core::adapter::{OperationFuture, execute_polled_async, list_all_async};
use trellis_core::idempotency::Idempotency;
use trellis_core::lro::execute_polled;
use trellis_core::metadata::CallMetadata;
use trellis_core::paginate::list_all;
use trellis_core::queue::CompletionQueue;
use trellis_protocol::{
    DeleteSnapshotRequest, GetOperationRequest, GetSnapshotRequest, ListSnapshotsRequest,
    OperationName, Snapshot, SnapshotTableRequest,
};

use super::{Resource, call, call_async};
use crate::client::TableAdmin;

/// Snapshot operations for one instance's clusters.
///
/// Reached through [`TableAdmin::snapshots`].
#[derive(Clone)]
pub struct Snapshots {
    admin: TableAdmin,
}

impl Snapshots {
    pub(crate) fn new(admin: TableAdmin) -> Self {
        Self { admin }
    }

    /// Snapshot a table, waiting for the snapshot to become ready.
    ///
    /// The server answers the initiating call with an operation handle
    /// (or, for a small table, with the finished snapshot inline), and
    /// the handle is polled until the snapshot is ready, the operation
    /// reports a failure, or the polling budget runs out. The initiating
    /// call names the snapshot it creates, so repeating it is safe and
    /// transient failures are retried.
    #[tracing::instrument(skip(self, request), fields(table = %request.name, snapshot = %request.snapshot_id))]
    pub fn create(&self, request: SnapshotTableRequest) -> Result<Snapshot> {
        let snapshot_name = request.snapshot_name()?;
        let metadata = CallMetadata::name(request.name.to_string());
        let connection = self.admin.connection();

        let mut retry = self.admin.retry_prototype().clone_policy();
        let mut backoff = self.admin.backoff_prototype().clone_policy();
        let mut polling = self.admin.polling_prototype().clone_policy();
        let mut attempts = 0u32;
        let mut poll_metadata: Option<CallMetadata> = None;

        let result = execute_polled(
            &snapshot_name.to_string(),
            self.admin.effective(Idempotency::Idempotent),
            retry.as_mut(),
            backoff.as_mut(),
            polling.as_mut(),
            std::thread::sleep,
            || {
                attempts += 1;
                metadata.log_attempt(attempts);
                connection
                    .snapshot_table(&metadata, &request)?
                    .into_started::<Snapshot>()
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
            Ok(snapshot) => info!(snapshot = %snapshot.name, "Snapshot ready"),
            Err(error) => warn!(error = %error, "Snapshot failed"),
        }
        result.map_err(|error| {
            error.context(format!(
                "snapshotting {} as {}",
                request.name, snapshot_name
            ))
        })
    }

    /// Fetch a snapshot's metadata.
    pub fn get(&self, request: GetSnapshotRequest) -> Result<Snapshot> {
        let metadata = CallMetadata::name(request.name.to_string());
        let connection = self.admin.connection();

        call(&self.admin, Idempotency::Idempotent, &metadata, || {
            connection.get_snapshot(&metadata, &request)
        })
        .map_err(|error| error.context(format!("fetching snapshot {}", request.name)))
    }

    /// List every snapshot in a cluster, walking all pages.
    pub fn list(&self, request: ListSnapshotsRequest) -> Result<Vec<Snapshot>> {
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
                connection.list_snapshots(&metadata, &page_request)
            },
        )
        .map_err(|error| error.context(format!("listing snapshots in {}", request.parent)))
    }

    /// Permanently delete a snapshot.
    pub fn delete(&self, request: DeleteSnapshotRequest) -> Result<()> {
        let metadata = CallMetadata::name(request.name.to_string());
        let connection = self.admin.connection();

        call(&self.admin, Idempotency::Idempotent, &metadata, || {
            connection.delete_snapshot(&metadata, &request)
        })
        .map_err(|error| error.context(format!("deleting snapshot {}", request.name)))
    }

    /// Snapshot a table without blocking; see [`create`](Self::create).
    pub fn create_async(
        &self,
        queue: &CompletionQueue,
        request: SnapshotTableRequest,
    ) -> OperationFuture<Snapshot> {
        let snapshot_name = match request.snapshot_name() {
            Ok(name) => name,
            Err(error) => return OperationFuture::ready(Err(error)),
        };
        let metadata = CallMetadata::name(request.name.to_string());
        let connection = self.admin.connection().clone();
        let poll_connection = connection.clone();
        let mut attempts = 0u32;
        let mut poll_metadata: Option<CallMetadata> = None;

        execute_polled_async(
            queue,
            snapshot_name.to_string(),
            self.admin.effective(Idempotency::Idempotent),
            self.admin.retry_prototype().clone_policy(),
            self.admin.backoff_prototype().clone_policy(),
            self.admin.polling_prototype().clone_policy(),
            move || {
                attempts += 1;
                metadata.log_attempt(attempts);
                connection.snapshot_table(&metadata, &request)?.into_started()
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

    /// Fetch a snapshot without blocking; see [`get`](Self::get).
    pub fn get_async(
        &self,
        queue: &CompletionQueue,
        request: GetSnapshotRequest,
    ) -> OperationFuture<Snapshot> {
        let metadata = CallMetadata::name(request.name.to_string());
        let connection = self.admin.connection().clone();

        call_async(
            &self.admin,
            queue,
            Idempotency::Idempotent,
            metadata.clone(),
            move || connection.get_snapshot(&metadata, &request),
        )
    }

    /// List every snapshot without blocking; see [`list`](Self::list).
    pub fn list_async(
        &self,
        queue: &CompletionQueue,
        request: ListSnapshotsRequest,
    ) -> OperationFuture<Vec<Snapshot>> {
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
                connection.list_snapshots(&metadata, &page_request)
            },
        )
    }

    /// Delete a snapshot without blocking; see [`delete`](Self::delete).
    pub fn delete_async(
        &self,
        queue: &CompletionQueue,
        request: DeleteSnapshotRequest,
    ) -> OperationFuture<()> {
        let metadata = CallMetadata::name(request.name.to_string());
        let connection = self.admin.connection().clone();

        call_async(
            &self.admin,
            queue,
            Idempotency::Idempotent,
            metadata.clone(),
            move || connection.delete_snapshot(&metadata, &request),
        )
    }
}

impl Resource for Snapshots {
    fn admin(&self) -> &TableAdmin {
        &self.admin
    }
}
