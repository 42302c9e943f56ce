//! The retry loop: repeated attempts of one fallible operation.

use crate::error::{Error, Result};
use crate::idempotency::Idempotency;
use std::time::Duration;
use tracing::{debug, warn};

use super::backoff::BackoffPolicy;
use super::policy::{LoopState, RetryPolicy};

/// What to do after a failed attempt.
#[derive(Debug)]
pub(crate) enum AttemptDisposition {
    /// Stop and return this error.
    Finish(Error),
    /// Sleep for this long, then try again.
    Backoff(Duration),
}

/// Decide what a failed attempt means for the operation.
///
/// Non-idempotent operations finish on their first error without consulting
/// any policy: a transient failure may mean the side effect was applied,
/// so a second attempt could apply it twice. For idempotent operations the
/// retry policy rules on the error, and exhaustion wraps the last failure
/// in [`Error::RetriesExhausted`].
pub(crate) fn after_failure(
    idempotency: Idempotency,
    retry: &mut dyn RetryPolicy,
    backoff: &mut dyn BackoffPolicy,
    attempts: u32,
    error: Error,
) -> AttemptDisposition {
    if !idempotency.is_idempotent() {
        return AttemptDisposition::Finish(error);
    }
    match retry.on_failure(error) {
        LoopState::Permanent(error) => AttemptDisposition::Finish(error),
        LoopState::Exhausted(error) => {
            warn!(attempts, error = %error, "Retry policy exhausted");
            AttemptDisposition::Finish(Error::RetriesExhausted {
                attempts,
                source: Box::new(error),
            })
        }
        LoopState::Continue(error) => {
            let delay = backoff.next_delay();
            debug!(
                attempt = attempts,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Transient failure, backing off"
            );
            AttemptDisposition::Backoff(delay)
        }
    }
}

/// Run `operation` until it succeeds or the policies give up.
///
/// `operation` makes one attempt per call. Between attempts the loop
/// sleeps through `sleep`, which the synchronous entry points bind to
/// [`std::thread::sleep`]; tests can record delays instead.
///
/// The policies passed in must be fresh clones dedicated to this one
/// operation.
pub fn execute_with_retry<T>(
    idempotency: Idempotency,
    retry: &mut dyn RetryPolicy,
    backoff: &mut dyn BackoffPolicy,
    mut sleep: impl FnMut(Duration),
    mut operation: impl FnMut() -> Result<T>,
) -> Result<T> {
    let mut attempts = 0u32;
    loop {
        attempts += 1;
        let error = match operation() {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };
        match after_failure(idempotency, retry, backoff, attempts, error) {
            AttemptDisposition::Finish(error) => return Err(error),
            AttemptDisposition::Backoff(delay) => sleep(delay),
        }
    }
}
