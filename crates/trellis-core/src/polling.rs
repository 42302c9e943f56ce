//! Polling policies for long-running operations.
//!
//! A polling policy answers two questions while a long-running operation
//! is outstanding: "should I check again" and "how long until the next
//! check". [`GenericPollingPolicy`] composes an ordinary [`RetryPolicy`]
//! for the first and a [`BackoffPolicy`] for the second, and turns a spent
//! budget into [`Error::PollingExhausted`].

use crate::error::Error;
use crate::retry::{
    BackoffPolicy, ExponentialBackoff, LimitedElapsedTime, LoopState, RetryPolicy,
};
use std::time::Duration;
use tracing::{debug, warn};

/// Governs repeated status checks of one long-running operation.
///
/// Like the retry policies, a polling policy is stateful and belongs to
/// one operation; [`PollingPolicy::clone_policy`] produces a fresh copy.
pub trait PollingPolicy: Send + Sync + std::fmt::Debug {
    /// Rule on a status check that itself failed.
    ///
    /// [`LoopState::Continue`] keeps polling. [`LoopState::Permanent`] and
    /// [`LoopState::Exhausted`] carry the terminal error to return, and an
    /// exhausted verdict already wraps it in [`Error::PollingExhausted`].
    fn on_error(&mut self, operation: &str, error: Error) -> LoopState;

    /// Record a check that found the operation still in progress.
    ///
    /// Returns `None` to keep polling, or the terminal
    /// [`Error::PollingExhausted`] once the budget is spent.
    fn on_in_progress(&mut self, operation: &str) -> Option<Error>;

    /// The delay before the next status check.
    fn wait_period(&mut self) -> Duration;

    /// A fresh copy of this policy with a full budget.
    fn clone_policy(&self) -> Box<dyn PollingPolicy>;
}

/// A polling policy composed from a retry policy and a backoff policy.
///
/// The retry policy's budget is spent by every status check, whether the
/// check failed transiently or found the operation still in progress.
/// Under `LimitedAttemptCount::new(3)` the third check that does not see
/// completion ends the poll with [`Error::PollingExhausted`].
#[derive(Debug)]
pub struct GenericPollingPolicy {
    retry: Box<dyn RetryPolicy>,
    backoff: Box<dyn BackoffPolicy>,
    checks: u32,
}

impl GenericPollingPolicy {
    /// Compose a polling policy from its two halves.
    pub fn new(retry: Box<dyn RetryPolicy>, backoff: Box<dyn BackoffPolicy>) -> Self {
        Self {
            retry,
            backoff,
            checks: 0,
        }
    }

    fn exhausted(&self, operation: &str, source: Option<Box<Error>>) -> Error {
        warn!(
            operation,
            checks = self.checks,
            "Polling policy exhausted before the operation completed"
        );
        Error::PollingExhausted {
            operation: operation.to_string(),
            checks: self.checks,
            source,
        }
    }
}

impl Default for GenericPollingPolicy {
    /// A polling policy suited to slow administrative operations: poll
    /// for up to five minutes, starting half a second between checks and
    /// backing off to thirty seconds.
    ///
    /// Status checks carry no side effects and different clients poll
    /// different operations, so the default uses no jitter; checks at
    /// predictable intervals make operation timelines easier to read in
    /// logs.
    fn default() -> Self {
        Self::new(
            Box::new(LimitedElapsedTime::new(Duration::from_secs(300))),
            Box::new(
                ExponentialBackoff::builder()
                    .initial_delay(Duration::from_millis(500))
                    .max_delay(Duration::from_secs(30))
                    .jitter(0.0)
                    .build(),
            ),
        )
    }
}

impl PollingPolicy for GenericPollingPolicy {
    fn on_error(&mut self, operation: &str, error: Error) -> LoopState {
        self.checks += 1;
        match self.retry.on_failure(error) {
            LoopState::Exhausted(error) => {
                LoopState::Exhausted(self.exhausted(operation, Some(Box::new(error))))
            }
            LoopState::Continue(error) => {
                debug!(operation, check = self.checks, error = %error, "Status check failed, will poll again");
                LoopState::Continue(error)
            }
            permanent => permanent,
        }
    }

    fn on_in_progress(&mut self, operation: &str) -> Option<Error> {
        self.checks += 1;
        if self.retry.on_in_progress() {
            debug!(operation, check = self.checks, "Operation still in progress");
            None
        } else {
            Some(self.exhausted(operation, None))
        }
    }

    fn wait_period(&mut self) -> Duration {
        self.backoff.next_delay()
    }

    fn clone_policy(&self) -> Box<dyn PollingPolicy> {
        Box::new(Self::new(
            self.retry.clone_policy(),
            self.backoff.clone_policy(),
        ))
    }
}
