//! Administrative API resources.
//!
//! Operations are grouped by the resource they act on: tables,
//! snapshots, and replication consistency. Each group is reached
//! through a lazy accessor on [`TableAdmin`] and owns nothing beyond a
//! handle back to the client; all state that matters (connection,
//! policy prototypes) lives in the client.

pub mod consistency;
pub mod snapshots;
pub mod tables;

pub use consistency::ConsistencyTokens;
pub use snapshots::Snapshots;
pub use tables::Tables;

use trellis_core::Result;
use trellis_core::adapter::{OperationFuture, execute_with_retry_async};
use trellis_core::idempotency::Idempotency;
use trellis_core::metadata::CallMetadata;
use trellis_core::queue::CompletionQueue;
use trellis_core::retry::execute_with_retry;

use crate::client::TableAdmin;

/// Access to the client a resource belongs to.
pub trait Resource {
    /// The client this resource issues operations through.
    fn admin(&self) -> &TableAdmin;
}

/// Run one RPC through the retry loop with fresh policy clones.
///
/// `declared` is the call site's idempotency classification; the
/// client's mutation policy gets the final word through `effective`.
/// Every attempt is logged under the metadata's invocation id.
pub(crate) fn call<T>(
    admin: &TableAdmin,
    declared: Idempotency,
    metadata: &CallMetadata,
    mut attempt: impl FnMut() -> Result<T>,
) -> Result<T> {
    let mut retry = admin.retry_prototype().clone_policy();
    let mut backoff = admin.backoff_prototype().clone_policy();
    let mut attempts = 0u32;
    execute_with_retry(
        admin.effective(declared),
        retry.as_mut(),
        backoff.as_mut(),
        std::thread::sleep,
        || {
            attempts += 1;
            metadata.log_attempt(attempts);
            attempt()
        },
    )
}

/// The non-blocking form of [`call`]: the retry loop runs as scheduled
/// continuations on `queue`.
pub(crate) fn call_async<T>(
    admin: &TableAdmin,
    queue: &CompletionQueue,
    declared: Idempotency,
    metadata: CallMetadata,
    mut attempt: impl FnMut() -> Result<T> + Send + 'static,
) -> OperationFuture<T>
where
    T: Send + 'static,
{
    let mut attempts = 0u32;
    execute_with_retry_async(
        queue,
        admin.effective(declared),
        admin.retry_prototype().clone_policy(),
        admin.backoff_prototype().clone_policy(),
        move || {
            attempts += 1;
            metadata.log_attempt(attempts);
            attempt()
        },
    )
}
