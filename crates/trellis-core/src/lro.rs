//! Long-running operations: initiate, poll, unwrap the result.
//!
//! Some administrative RPCs only start work on the server and hand back
//! an operation handle; completion is observed by polling a status check.
//! [`execute_polled`] drives the whole lifecycle: the initiating RPC runs
//! through the retry loop, then the handle is polled under a
//! [`PollingPolicy`] until the operation completes, fails, or the polling
//! budget runs out.
//!
//! The decision logic lives in [`on_poll_result`], a pure transition from
//! one check's outcome to the next step, so it is testable without any
//! real clock or scheduler.

use crate::error::{Error, Result};
use crate::idempotency::Idempotency;
use crate::polling::PollingPolicy;
use crate::retry::{execute_with_retry, BackoffPolicy, LoopState, RetryPolicy};
use crate::status::Status;
use std::time::Duration;
use tracing::debug;

/// Outcome of the RPC that initiates a long-running operation.
#[derive(Debug)]
pub enum StartedOperation<H, T> {
    /// The server accepted the request; poll this handle for completion.
    InProgress(H),
    /// The operation finished inline and needs no polling.
    Completed(T),
    /// The server already finished the operation, unsuccessfully.
    Failed(Status),
}

/// Outcome of one status check on an outstanding operation.
#[derive(Debug)]
pub enum OperationPoll<T> {
    /// The operation has not finished yet.
    Pending,
    /// The operation finished with this result.
    Completed(T),
    /// The operation finished and failed with this status.
    Failed(Status),
}

/// What the poll loop does after one status check.
#[derive(Debug)]
pub(crate) enum PollStep<T> {
    /// Sleep for this long, then check again.
    Wait(Duration),
    /// Stop polling and return this result.
    Finish(Result<T>),
}

/// Decide the next step from one status check's outcome.
///
/// A remote-reported operation failure is final: the server has already
/// given its verdict, so the error comes back without consulting the
/// polling policy. Only a pending status or a failure of the check itself
/// spends polling budget.
pub(crate) fn on_poll_result<T>(
    polling: &mut dyn PollingPolicy,
    operation: &str,
    outcome: Result<OperationPoll<T>>,
) -> PollStep<T> {
    match outcome {
        Ok(OperationPoll::Completed(value)) => {
            debug!(operation, "Operation completed");
            PollStep::Finish(Ok(value))
        }
        Ok(OperationPoll::Failed(status)) => {
            debug!(operation, status = %status, "Operation failed remotely");
            PollStep::Finish(Err(Error::Rpc(status)))
        }
        Ok(OperationPoll::Pending) => match polling.on_in_progress(operation) {
            None => PollStep::Wait(polling.wait_period()),
            Some(error) => PollStep::Finish(Err(error)),
        },
        Err(error) => match polling.on_error(operation, error) {
            LoopState::Continue(_) => PollStep::Wait(polling.wait_period()),
            LoopState::Permanent(error) | LoopState::Exhausted(error) => {
                PollStep::Finish(Err(error))
            }
        },
    }
}

/// Poll `check` until the operation completes or the policy gives up.
///
/// `operation` labels the work for log lines and exhaustion errors. The
/// polling policy must be a fresh clone dedicated to this operation.
pub fn poll_until_done<T>(
    operation: &str,
    polling: &mut dyn PollingPolicy,
    mut sleep: impl FnMut(Duration),
    mut check: impl FnMut() -> Result<OperationPoll<T>>,
) -> Result<T> {
    loop {
        match on_poll_result(polling, operation, check()) {
            PollStep::Finish(result) => return result,
            PollStep::Wait(delay) => sleep(delay),
        }
    }
}

/// Run a long-running operation end to end.
///
/// The initiating RPC runs through the retry loop under `retry`/`backoff`
/// and the given idempotency classification. If it reports the operation
/// still in progress, the returned handle is polled under `polling` until
/// a terminal state is reached.
#[allow(clippy::too_many_arguments)]
pub fn execute_polled<H, T>(
    operation: &str,
    idempotency: Idempotency,
    retry: &mut dyn RetryPolicy,
    backoff: &mut dyn BackoffPolicy,
    polling: &mut dyn PollingPolicy,
    mut sleep: impl FnMut(Duration),
    initiate: impl FnMut() -> Result<StartedOperation<H, T>>,
    mut check: impl FnMut(&H) -> Result<OperationPoll<T>>,
) -> Result<T> {
    let started = execute_with_retry(idempotency, retry, backoff, &mut sleep, initiate)?;
    match started {
        StartedOperation::Completed(value) => Ok(value),
        StartedOperation::Failed(status) => Err(Error::Rpc(status)),
        StartedOperation::InProgress(handle) => {
            poll_until_done(operation, polling, sleep, || check(&handle))
        }
    }
}
