//! Retry policies: when to keep trying and when to give up.

use crate::error::Error;
use std::time::{Duration, Instant};

/// The verdict a retry policy hands back after a failed attempt.
///
/// Each variant carries the error so the retry loop can surface it (or wrap
/// it) without cloning.
#[derive(Debug)]
pub enum LoopState {
    /// Stop: the error cannot be cleared by retrying.
    Permanent(Error),
    /// Stop: the error was retryable but the budget is spent.
    Exhausted(Error),
    /// Keep going: back off and try again.
    Continue(Error),
}

impl LoopState {
    /// Whether the policy ruled the failure permanent.
    pub fn is_permanent(&self) -> bool {
        matches!(self, LoopState::Permanent(_))
    }

    /// Whether the policy ran out of budget.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, LoopState::Exhausted(_))
    }

    /// Whether the policy allows another attempt.
    pub fn is_continue(&self) -> bool {
        matches!(self, LoopState::Continue(_))
    }

    /// Extract the error carried by this verdict.
    pub fn into_error(self) -> Error {
        match self {
            LoopState::Permanent(e) | LoopState::Exhausted(e) | LoopState::Continue(e) => e,
        }
    }
}

/// Decides whether a failed or still-pending operation deserves another
/// attempt.
///
/// Policies are stateful: each consultation may spend budget, and once a
/// policy reports exhaustion it stays exhausted. A policy instance belongs
/// to exactly one logical operation; call [`RetryPolicy::clone_policy`] to
/// get a fresh copy with a full budget before starting a new one.
pub trait RetryPolicy: Send + Sync + std::fmt::Debug {
    /// Record a failed attempt and decide whether to try again.
    ///
    /// Permanent errors return [`LoopState::Permanent`] without spending
    /// budget. Transient errors spend one unit of budget and return
    /// [`LoopState::Continue`] or [`LoopState::Exhausted`].
    fn on_failure(&mut self, error: Error) -> LoopState;

    /// Record a "still in progress" status check and decide whether to
    /// keep waiting.
    ///
    /// Spends one unit of budget. Returns `false` once the budget is gone.
    fn on_in_progress(&mut self) -> bool;

    /// Whether the budget is already spent.
    fn is_exhausted(&self) -> bool;

    /// A fresh copy of this policy with a full budget.
    fn clone_policy(&self) -> Box<dyn RetryPolicy>;
}

/// Retry policy that allows a fixed number of attempts.
///
/// An operation run under `LimitedAttemptCount::new(3)` makes at most three
/// attempts: two transient failures still leave room for a third try, a
/// third transient failure exhausts the policy.
///
/// # Examples
///
/// ```rust
/// use trellis_core::retry::{LimitedAttemptCount, RetryPolicy};
/// use trellis_core::{Error, StatusCode};
///
/// let mut policy = LimitedAttemptCount::new(3);
/// let verdict = policy.on_failure(Error::rpc(StatusCode::Unavailable, "busy"));
/// assert!(verdict.is_continue());
/// ```
#[derive(Debug, Clone)]
pub struct LimitedAttemptCount {
    maximum_attempts: u32,
    attempts: u32,
}

impl LimitedAttemptCount {
    /// Create a policy allowing `maximum_attempts` attempts in total.
    ///
    /// # Panics
    ///
    /// Panics if `maximum_attempts` is zero; a policy that permits no
    /// attempts at all is a programming error, not a runtime condition.
    pub fn new(maximum_attempts: u32) -> Self {
        assert!(
            maximum_attempts > 0,
            "maximum_attempts must be at least one"
        );
        Self {
            maximum_attempts,
            attempts: 0,
        }
    }

    /// The configured attempt limit.
    pub fn maximum_attempts(&self) -> u32 {
        self.maximum_attempts
    }
}

impl RetryPolicy for LimitedAttemptCount {
    fn on_failure(&mut self, error: Error) -> LoopState {
        if error.is_permanent() {
            return LoopState::Permanent(error);
        }
        self.attempts += 1;
        if self.attempts >= self.maximum_attempts {
            LoopState::Exhausted(error)
        } else {
            LoopState::Continue(error)
        }
    }

    fn on_in_progress(&mut self) -> bool {
        self.attempts += 1;
        self.attempts < self.maximum_attempts
    }

    fn is_exhausted(&self) -> bool {
        self.attempts >= self.maximum_attempts
    }

    fn clone_policy(&self) -> Box<dyn RetryPolicy> {
        Box::new(Self::new(self.maximum_attempts))
    }
}

/// Retry policy that allows attempts until a wall-clock deadline.
///
/// The clock starts when the policy is created (or cloned): a policy built
/// with a five minute limit and cloned an hour later still grants the new
/// operation its full five minutes.
#[derive(Debug, Clone)]
pub struct LimitedElapsedTime {
    maximum_duration: Duration,
    deadline: Instant,
}

impl LimitedElapsedTime {
    /// Create a policy allowing attempts for `maximum_duration` from now.
    ///
    /// # Panics
    ///
    /// Panics if `maximum_duration` is zero.
    pub fn new(maximum_duration: Duration) -> Self {
        assert!(
            !maximum_duration.is_zero(),
            "maximum_duration must be positive"
        );
        Self {
            maximum_duration,
            deadline: Instant::now() + maximum_duration,
        }
    }

    /// The configured time limit.
    pub fn maximum_duration(&self) -> Duration {
        self.maximum_duration
    }
}

impl RetryPolicy for LimitedElapsedTime {
    fn on_failure(&mut self, error: Error) -> LoopState {
        if error.is_permanent() {
            return LoopState::Permanent(error);
        }
        if Instant::now() >= self.deadline {
            LoopState::Exhausted(error)
        } else {
            LoopState::Continue(error)
        }
    }

    fn on_in_progress(&mut self) -> bool {
        Instant::now() < self.deadline
    }

    fn is_exhausted(&self) -> bool {
        Instant::now() >= self.deadline
    }

    fn clone_policy(&self) -> Box<dyn RetryPolicy> {
        Box::new(Self::new(self.maximum_duration))
    }
}
