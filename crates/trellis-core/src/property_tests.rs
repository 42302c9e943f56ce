//! Property-based tests for the retry machinery.
//!
//! This module uses proptest to generate random policy configurations and
//! failure patterns and verify the invariants the rest of the crate
//! relies on: backoff schedules never exceed their cap, attempt budgets
//! are spent exactly once per failure, and pagination preserves order.

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use crate::error::Error;
    use crate::idempotency::Idempotency;
    use crate::paginate::{list_all, Page};
    use crate::retry::{
        execute_with_retry, BackoffPolicy, ExponentialBackoff, LimitedAttemptCount, RetryPolicy,
    };
    use crate::status::StatusCode;
    use std::time::Duration;

    // ===== Strategy Generators =====

    fn arb_initial_delay_ms() -> impl Strategy<Value = u64> {
        1u64..1_000u64
    }

    fn arb_multiplier() -> impl Strategy<Value = f64> {
        1.0f64..4.0f64
    }

    fn arb_budget() -> impl Strategy<Value = u32> {
        1u32..50u32
    }

    fn transient() -> Error {
        Error::rpc(StatusCode::Unavailable, "try again")
    }

    // ===== Backoff Properties =====

    proptest! {
        /// Property: without jitter, consecutive delays never decrease
        /// Invariant: the schedule is monotone and capped at max_delay
        #[test]
        fn prop_backoff_is_monotone_and_capped(
            initial_ms in arb_initial_delay_ms(),
            multiplier in arb_multiplier(),
            cap_factor in 1u64..20u64,
        ) {
            let initial = Duration::from_millis(initial_ms);
            let max = Duration::from_millis(initial_ms * cap_factor);
            let mut backoff = ExponentialBackoff::builder()
                .initial_delay(initial)
                .max_delay(max)
                .multiplier(multiplier)
                .jitter(0.0)
                .build();

            let mut previous = Duration::ZERO;
            for _ in 0..20 {
                let delay = backoff.next_delay();
                prop_assert!(delay >= previous, "delay {delay:?} shrank below {previous:?}");
                prop_assert!(delay <= max, "delay {delay:?} exceeded cap {max:?}");
                previous = delay;
            }
        }

        /// Property: jittered delays stay within the configured cap
        /// Invariant: jitter widens the range but never past max_delay
        #[test]
        fn prop_jittered_backoff_never_exceeds_cap(
            initial_ms in arb_initial_delay_ms(),
            jitter in 0.0f64..=1.0f64,
        ) {
            let initial = Duration::from_millis(initial_ms);
            let max = Duration::from_millis(initial_ms * 4);
            let mut backoff = ExponentialBackoff::builder()
                .initial_delay(initial)
                .max_delay(max)
                .jitter(jitter)
                .build();

            for _ in 0..20 {
                prop_assert!(backoff.next_delay() <= max);
            }
        }
    }

    // ===== Retry Policy Properties =====

    proptest! {
        /// Property: a budget of N attempts survives exactly N-1 failures
        /// Invariant: the Nth transient failure, and only it, exhausts
        #[test]
        fn prop_attempt_budget_is_spent_exactly(budget in arb_budget()) {
            let mut policy = LimitedAttemptCount::new(budget);
            for _ in 0..budget.saturating_sub(1) {
                prop_assert!(policy.on_failure(transient()).is_continue());
            }
            prop_assert!(policy.on_failure(transient()).is_exhausted());
        }

        /// Property: the retry loop makes failures + 1 calls on success
        /// Invariant: N-1 transient failures under a budget of N still
        /// succeed, with every attempt observed
        #[test]
        fn prop_retry_loop_counts_attempts(
            budget in 2u32..20u32,
            failures in 0u32..19u32,
        ) {
            prop_assume!(failures < budget);
            let mut retry = LimitedAttemptCount::new(budget);
            let mut backoff = ExponentialBackoff::builder()
                .initial_delay(Duration::from_micros(1))
                .jitter(0.0)
                .build();
            let mut calls = 0u32;

            let result = execute_with_retry(
                Idempotency::Idempotent,
                &mut retry,
                &mut backoff,
                |_| {},
                || {
                    calls += 1;
                    if calls <= failures { Err(transient()) } else { Ok(calls) }
                },
            );

            prop_assert_eq!(result.unwrap(), failures + 1);
            prop_assert_eq!(calls, failures + 1);
        }

        /// Property: exhaustion happens after exactly budget calls
        /// Invariant: no attempt is made past the budget
        #[test]
        fn prop_retry_loop_stops_at_the_budget(budget in arb_budget()) {
            let mut retry = LimitedAttemptCount::new(budget);
            let mut backoff = ExponentialBackoff::builder()
                .initial_delay(Duration::from_micros(1))
                .jitter(0.0)
                .build();
            let mut calls = 0u32;

            let result: crate::Result<()> = execute_with_retry(
                Idempotency::Idempotent,
                &mut retry,
                &mut backoff,
                |_| {},
                || {
                    calls += 1;
                    Err(transient())
                },
            );

            prop_assert_eq!(calls, budget);
            prop_assert!(
                matches!(
                    result,
                    Err(Error::RetriesExhausted { attempts, .. }) if attempts == budget
                ),
                "expected RetriesExhausted with attempts == budget"
            );
        }
    }

    // ===== Pagination Properties =====

    struct VecPage {
        items: Vec<u32>,
        token: String,
    }

    impl Page for VecPage {
        type Item = u32;

        fn next_token(&self) -> &str {
            &self.token
        }

        fn into_items(self) -> Vec<u32> {
            self.items
        }
    }

    proptest! {
        /// Property: ListAll returns every item in page-then-response order
        /// Invariant: pagination neither drops, duplicates, nor reorders
        #[test]
        fn prop_pagination_preserves_order(
            pages in prop::collection::vec(prop::collection::vec(any::<u32>(), 0..5), 1..6),
        ) {
            let expected: Vec<u32> = pages.iter().flatten().copied().collect();
            let total = pages.len();

            let items = list_all(
                &LimitedAttemptCount::new(3),
                &ExponentialBackoff::default(),
                |_| {},
                |token| {
                    let index: usize = if token.is_empty() {
                        0
                    } else {
                        token.parse().unwrap()
                    };
                    let next = if index + 1 < total {
                        (index + 1).to_string()
                    } else {
                        String::new()
                    };
                    Ok(VecPage { items: pages[index].clone(), token: next })
                },
            )
            .unwrap();

            prop_assert_eq!(items, expected);
        }
    }
}
