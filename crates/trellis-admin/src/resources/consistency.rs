//! Replication consistency operations.
//!
//! A consistency token marks a point in a table's mutation stream;
//! checking it asks whether every replica has caught up to that point.
//! Waiting for consistency is shaped like a long-running operation,
//! with "inconsistent" playing the role of "still in progress", so it
//! runs under the client's polling policy.

use tracing::{info, warn};

use trellis_core::Result;
use trellis_core::adapter::{OperationFuture, execute_polled_async};
use trellis_core::idempotency::Idempotency;
use trellis_core::lro::{OperationPoll, StartedOperation, poll_until_done};
use trellis_core::metadata::CallMetadata;
use trellis_core::queue::CompletionQueue;
use trellis_protocol::{
    CheckConsistencyRequest, Consistency, ConsistencyToken, GenerateConsistencyTokenRequest,
};

use super::{Resource, call, call_async};
use crate::client::TableAdmin;

/// Consistency token operations.
///
/// Reached through [`TableAdmin::consistency`].
#[derive(Clone)]
pub struct ConsistencyTokens {
    admin: TableAdmin,
}

impl ConsistencyTokens {
    pub(crate) fn new(admin: TableAdmin) -> Self {
        Self { admin }
    }

    /// Mint a token covering every mutation applied to the table so
    /// far.
    pub fn generate_token(
        &self,
        request: GenerateConsistencyTokenRequest,
    ) -> Result<ConsistencyToken> {
        let metadata = CallMetadata::name(request.name.to_string());
        let connection = self.admin.connection();

        call(&self.admin, Idempotency::Idempotent, &metadata, || {
            connection.generate_consistency_token(&metadata, &request)
        })
        .map(|response| response.consistency_token)
        .map_err(|error| {
            error.context(format!("generating consistency token for {}", request.name))
        })
    }

    /// Ask once whether replication has caught up with a token.
    pub fn check(&self, request: CheckConsistencyRequest) -> Result<Consistency> {
        let metadata = CallMetadata::name(request.name.to_string());
        let connection = self.admin.connection();

        call(&self.admin, Idempotency::Idempotent, &metadata, || {
            connection.check_consistency(&metadata, &request)
        })
        .map(|response| response.consistency())
        .map_err(|error| error.context(format!("checking consistency of {}", request.name)))
    }

    /// Poll until replication has caught up with a token.
    ///
    /// Each inconsistent answer spends polling budget and waits out the
    /// polling backoff before asking again; a check that itself fails
    /// transiently is treated the same way. Returns the polling
    /// exhaustion error if the table never reports consistent in time.
    #[tracing::instrument(skip(self, request), fields(table = %request.name))]
    pub fn wait(&self, request: CheckConsistencyRequest) -> Result<()> {
        let metadata = CallMetadata::name(request.name.to_string());
        let connection = self.admin.connection();
        let mut polling = self.admin.polling_prototype().clone_policy();
        let operation = request.name.to_string();
        let mut checks = 0u32;

        let result = poll_until_done(&operation, polling.as_mut(), std::thread::sleep, || {
            checks += 1;
            metadata.log_attempt(checks);
            let response = connection.check_consistency(&metadata, &request)?;
            Ok(match response.consistency() {
                Consistency::Consistent => OperationPoll::Completed(()),
                Consistency::Inconsistent => OperationPoll::Pending,
            })
        });

        match &result {
            Ok(()) => info!(checks, "Table is consistent"),
            Err(error) => warn!(checks, error = %error, "Consistency wait failed"),
        }
        result.map_err(|error| {
            error.context(format!("waiting for {} to become consistent", request.name))
        })
    }

    /// Mint a token without blocking; see
    /// [`generate_token`](Self::generate_token).
    pub fn generate_token_async(
        &self,
        queue: &CompletionQueue,
        request: GenerateConsistencyTokenRequest,
    ) -> OperationFuture<ConsistencyToken> {
        let metadata = CallMetadata::name(request.name.to_string());
        let connection = self.admin.connection().clone();

        call_async(
            &self.admin,
            queue,
            Idempotency::Idempotent,
            metadata.clone(),
            move || {
                connection
                    .generate_consistency_token(&metadata, &request)
                    .map(|response| response.consistency_token)
            },
        )
    }

    /// Check consistency once without blocking; see
    /// [`check`](Self::check).
    pub fn check_async(
        &self,
        queue: &CompletionQueue,
        request: CheckConsistencyRequest,
    ) -> OperationFuture<Consistency> {
        let metadata = CallMetadata::name(request.name.to_string());
        let connection = self.admin.connection().clone();

        call_async(
            &self.admin,
            queue,
            Idempotency::Idempotent,
            metadata.clone(),
            move || {
                connection
                    .check_consistency(&metadata, &request)
                    .map(|response| response.consistency())
            },
        )
    }

    /// Poll for consistency without blocking; see [`wait`](Self::wait).
    pub fn wait_async(
        &self,
        queue: &CompletionQueue,
        request: CheckConsistencyRequest,
    ) -> OperationFuture<()> {
        let metadata = CallMetadata::name(request.name.to_string());
        let connection = self.admin.connection().clone();
        let operation = request.name.to_string();
        let mut checks = 0u32;

        execute_polled_async(
            queue,
            operation,
            self.admin.effective(Idempotency::Idempotent),
            self.admin.retry_prototype().clone_policy(),
            self.admin.backoff_prototype().clone_policy(),
            self.admin.polling_prototype().clone_policy(),
            // There is nothing to initiate; the wait goes straight to
            // polling.
            || Ok(StartedOperation::InProgress(())),
            move |_: &()| {
                checks += 1;
                metadata.log_attempt(checks);
                let response = connection.check_consistency(&metadata, &request)?;
                Ok(match response.consistency() {
                    Consistency::Consistent => OperationPoll::Completed(()),
                    Consistency::Inconsistent => OperationPoll::Pending,
                })
            },
        )
    }
}

impl Resource for ConsistencyTokens {
    fn admin(&self) -> &TableAdmin {
        &self.admin
    }
}
