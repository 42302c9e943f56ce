#![deny(unsafe_code)]
#![warn(missing_docs)]

//! Resilience machinery for the Trellis client crates.
//!
//! This crate holds everything between "call the server once" and "the
//! caller has a final answer": classifying failures, deciding whether to
//! try again, spacing the attempts out, walking paginated listings, and
//! polling long-running operations to completion. The RPC transport
//! itself lives elsewhere; every entry point here takes a closure that
//! makes one attempt.
//!
//! - **Failure classification** via [`Status`] and [`Error`]
//! - **Retry and backoff policies** via [`retry::RetryPolicy`] and
//!   [`retry::BackoffPolicy`], cloned fresh for every logical operation
//! - **Idempotency rules** via [`idempotency::IdempotentMutationPolicy`]
//! - **Pagination** via [`paginate::list_all`]
//! - **Long-running operations** via [`lro::execute_polled`]
//! - **A non-blocking form of all of the above** via [`queue::CompletionQueue`]
//!   and the [`adapter`] module, for callers that donate threads instead
//!   of blocking them
//!
//! # Examples
//!
//! Retrying one fallible call:
//!
//! ```rust
//! use trellis_core::idempotency::Idempotency;
//! use trellis_core::retry::{execute_with_retry, ExponentialBackoff, LimitedAttemptCount};
//!
//! # fn example() -> trellis_core::Result<()> {
//! let mut retry = LimitedAttemptCount::new(3);
//! let mut backoff = ExponentialBackoff::default();
//!
//! let value = execute_with_retry(
//!     Idempotency::Idempotent,
//!     &mut retry,
//!     &mut backoff,
//!     std::thread::sleep,
//!     || Ok("one attempt of the underlying call"),
//! )?;
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod error;
pub mod idempotency;
pub mod lro;
pub mod metadata;
pub mod paginate;
pub mod polling;
pub mod queue;
pub mod retry;
pub mod status;

pub use error::{Error, Result};
pub use status::{Status, StatusCode};

/// Convenient re-exports of commonly used items.
///
/// Import the whole policy toolkit with:
///
/// ```rust
/// use trellis_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::adapter::{
        execute_polled_async, execute_with_retry_async, list_all_async, OperationFuture,
    };
    pub use crate::error::{Error, Result};
    pub use crate::idempotency::{
        AlwaysRetryMutationPolicy, Idempotency, IdempotentMutationPolicy, Mutation,
        MutationBatch, SafeIdempotentMutationPolicy,
    };
    pub use crate::lro::{execute_polled, poll_until_done, OperationPoll, StartedOperation};
    pub use crate::metadata::{CallMetadata, MetadataParam};
    pub use crate::paginate::{list_all, Page};
    pub use crate::polling::{GenericPollingPolicy, PollingPolicy};
    pub use crate::queue::{CompletionQueue, QueueStatus};
    pub use crate::retry::{
        execute_with_retry, BackoffPolicy, ExponentialBackoff, ExponentialBackoffBuilder,
        LimitedAttemptCount, LimitedElapsedTime, LoopState, RetryPolicy,
    };
    pub use crate::status::{Status, StatusCode};
}

#[cfg(test)]
mod property_tests;
