//! Retry policies, backoff schedules, and the loop that drives them.
//!
//! Every remote call in the Trellis client crates goes through
//! [`execute_with_retry`]: one fallible attempt, a [`RetryPolicy`] ruling
//! on each failure, a [`BackoffPolicy`] spacing out the attempts, and an
//! idempotency classification deciding whether retrying is allowed at all.
//!
//! # Key Types
//!
//! - [`RetryPolicy`] - when to keep trying ([`LimitedAttemptCount`],
//!   [`LimitedElapsedTime`])
//! - [`BackoffPolicy`] - how long to wait between attempts
//!   ([`ExponentialBackoff`])
//! - [`execute_with_retry`] - the loop tying them together
//!
//! # Examples
//!
//! ```rust
//! use trellis_core::idempotency::Idempotency;
//! use trellis_core::retry::{execute_with_retry, ExponentialBackoff, LimitedAttemptCount};
//! use std::time::Duration;
//!
//! # fn example() -> trellis_core::Result<()> {
//! let mut retry = LimitedAttemptCount::new(3);
//! let mut backoff = ExponentialBackoff::builder()
//!     .initial_delay(Duration::from_millis(100))
//!     .build();
//!
//! let value = execute_with_retry(
//!     Idempotency::Idempotent,
//!     &mut retry,
//!     &mut backoff,
//!     std::thread::sleep,
//!     || {
//!         // One attempt of your operation here
//!         Ok(42)
//!     },
//! )?;
//! assert_eq!(value, 42);
//! # Ok(())
//! # }
//! ```

mod backoff;
mod driver;
mod policy;

pub use backoff::{BackoffPolicy, ExponentialBackoff, ExponentialBackoffBuilder};
pub use driver::execute_with_retry;
pub use policy::{LimitedAttemptCount, LimitedElapsedTime, LoopState, RetryPolicy};

pub(crate) use driver::{after_failure, AttemptDisposition};
