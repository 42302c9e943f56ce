//! Client configuration: policy knobs and how they become policies.
//!
//! [`AdminConfig`] holds plain data. The client builder turns it into
//! policy prototypes through the factory methods here, so every knob is
//! equally reachable from a config struct, the fluent
//! [`AdminConfigBuilder`], or `TRELLIS_*` environment variables.

use std::time::Duration;

use trellis_core::idempotency::{
    AlwaysRetryMutationPolicy, IdempotentMutationPolicy, SafeIdempotentMutationPolicy,
};
use trellis_core::polling::{GenericPollingPolicy, PollingPolicy};
use trellis_core::retry::{
    BackoffPolicy, ExponentialBackoff, LimitedAttemptCount, LimitedElapsedTime, RetryPolicy,
};

/// Which mutations the client treats as safe to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MutationMode {
    /// Retry only mutations that are provably idempotent; operations
    /// declared non-idempotent get exactly one attempt.
    #[default]
    Safe,
    /// Retry everything, including operations declared non-idempotent.
    /// The caller accepts that a retried side effect may be applied
    /// twice.
    AlwaysRetry,
}

/// Tunable behavior of a [`TableAdmin`](crate::TableAdmin) client.
///
/// All fields have working defaults; construct with
/// [`AdminConfig::default`], the [`builder`](AdminConfig::builder), or
/// [`from_env`](AdminConfig::from_env), and combine sources with
/// [`merge`](AdminConfig::merge).
#[derive(Debug, Clone, PartialEq)]
pub struct AdminConfig {
    /// Maximum attempts per logical RPC, counting the first one.
    ///
    /// Ignored when `retry_deadline` is set; a deadline-based budget
    /// takes precedence over the attempt count.
    pub max_attempts: u32,

    /// Overall time budget per logical RPC, measured from its first
    /// attempt. `None` limits by attempt count instead.
    pub retry_deadline: Option<Duration>,

    /// Delay before the second attempt.
    pub initial_backoff: Duration,

    /// Ceiling on the delay between attempts.
    pub max_backoff: Duration,

    /// Factor applied to the delay after each attempt.
    pub backoff_multiplier: f64,

    /// Fraction of the delay randomized away from the schedule, in
    /// `[0.0, 1.0]`. Zero makes delays deterministic.
    pub backoff_jitter: f64,

    /// Time budget for polling one long-running operation.
    pub poll_deadline: Duration,

    /// Delay before the first status re-check of a long-running
    /// operation.
    pub initial_poll_delay: Duration,

    /// Ceiling on the delay between status checks.
    pub max_poll_delay: Duration,

    /// Which mutations are safe to retry.
    pub mutation_mode: MutationMode,
}

impl Default for AdminConfig {
    /// Defaults:
    /// - `max_attempts`: 3
    /// - `retry_deadline`: none (attempt-count limited)
    /// - `initial_backoff`: 100ms, `max_backoff`: 60s
    /// - `backoff_multiplier`: 2.0, `backoff_jitter`: 0.1
    /// - `poll_deadline`: 5 minutes
    /// - `initial_poll_delay`: 500ms, `max_poll_delay`: 30s
    /// - `mutation_mode`: [`MutationMode::Safe`]
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_deadline: None,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            backoff_jitter: 0.1,
            poll_deadline: Duration::from_secs(300),
            initial_poll_delay: Duration::from_millis(500),
            max_poll_delay: Duration::from_secs(30),
            mutation_mode: MutationMode::Safe,
        }
    }
}

impl AdminConfig {
    /// Create a new builder for configuring the client.
    pub fn builder() -> AdminConfigBuilder {
        AdminConfigBuilder::default()
    }

    /// Load configuration overrides from environment variables.
    ///
    /// This will look for:
    /// - `TRELLIS_MAX_ATTEMPTS` for the attempt limit
    /// - `TRELLIS_RETRY_DEADLINE_SECS` for a deadline-based retry budget
    /// - `TRELLIS_INITIAL_BACKOFF_MS` and `TRELLIS_MAX_BACKOFF_MS` for
    ///   the backoff schedule
    /// - `TRELLIS_POLL_DEADLINE_SECS` for the polling budget
    /// - `TRELLIS_MUTATION_MODE` (`safe` or `always-retry`)
    ///
    /// Unset or unparseable variables leave the default in place.
    #[cfg(feature = "env")]
    pub fn from_env() -> Self {
        use std::env;

        let mut config = Self::default();

        if let Ok(attempts) = env::var("TRELLIS_MAX_ATTEMPTS")
            && let Ok(attempts) = attempts.parse::<u32>()
        {
            config.max_attempts = attempts;
        }

        if let Ok(deadline) = env::var("TRELLIS_RETRY_DEADLINE_SECS")
            && let Ok(secs) = deadline.parse::<u64>()
        {
            config.retry_deadline = Some(Duration::from_secs(secs));
        }

        if let Ok(delay) = env::var("TRELLIS_INITIAL_BACKOFF_MS")
            && let Ok(millis) = delay.parse::<u64>()
        {
            config.initial_backoff = Duration::from_millis(millis);
        }

        if let Ok(delay) = env::var("TRELLIS_MAX_BACKOFF_MS")
            && let Ok(millis) = delay.parse::<u64>()
        {
            config.max_backoff = Duration::from_millis(millis);
        }

        if let Ok(deadline) = env::var("TRELLIS_POLL_DEADLINE_SECS")
            && let Ok(secs) = deadline.parse::<u64>()
        {
            config.poll_deadline = Duration::from_secs(secs);
        }

        if let Ok(mode) = env::var("TRELLIS_MUTATION_MODE") {
            match mode.to_ascii_lowercase().as_str() {
                "safe" => config.mutation_mode = MutationMode::Safe,
                "always-retry" | "always_retry" => {
                    config.mutation_mode = MutationMode::AlwaysRetry;
                }
                _ => {}
            }
        }

        config
    }

    /// Merge this configuration with another, with the other taking
    /// precedence.
    ///
    /// A field of `other` wins when it differs from the default, so
    /// `base.merge(AdminConfig::from_env())` applies only the variables
    /// that were actually set.
    pub fn merge(mut self, other: AdminConfig) -> Self {
        let defaults = Self::default();

        if other.max_attempts != defaults.max_attempts {
            self.max_attempts = other.max_attempts;
        }
        if other.retry_deadline.is_some() {
            self.retry_deadline = other.retry_deadline;
        }
        if other.initial_backoff != defaults.initial_backoff {
            self.initial_backoff = other.initial_backoff;
        }
        if other.max_backoff != defaults.max_backoff {
            self.max_backoff = other.max_backoff;
        }
        if other.backoff_multiplier != defaults.backoff_multiplier {
            self.backoff_multiplier = other.backoff_multiplier;
        }
        if other.backoff_jitter != defaults.backoff_jitter {
            self.backoff_jitter = other.backoff_jitter;
        }
        if other.poll_deadline != defaults.poll_deadline {
            self.poll_deadline = other.poll_deadline;
        }
        if other.initial_poll_delay != defaults.initial_poll_delay {
            self.initial_poll_delay = other.initial_poll_delay;
        }
        if other.max_poll_delay != defaults.max_poll_delay {
            self.max_poll_delay = other.max_poll_delay;
        }
        if other.mutation_mode != defaults.mutation_mode {
            self.mutation_mode = other.mutation_mode;
        }

        self
    }

    /// The retry policy prototype this configuration describes.
    ///
    /// A set `retry_deadline` produces a [`LimitedElapsedTime`] budget;
    /// otherwise attempts are counted under [`LimitedAttemptCount`].
    pub fn retry_policy(&self) -> Box<dyn RetryPolicy> {
        match self.retry_deadline {
            Some(deadline) => Box::new(LimitedElapsedTime::new(deadline)),
            None => Box::new(LimitedAttemptCount::new(self.max_attempts)),
        }
    }

    /// The backoff policy prototype this configuration describes.
    pub fn backoff_policy(&self) -> Box<dyn BackoffPolicy> {
        Box::new(
            ExponentialBackoff::builder()
                .initial_delay(self.initial_backoff)
                .max_delay(self.max_backoff)
                .multiplier(self.backoff_multiplier)
                .jitter(self.backoff_jitter)
                .build(),
        )
    }

    /// The polling policy prototype this configuration describes.
    ///
    /// Status checks are free of side effects and polled operations are
    /// independent, so the polling schedule carries no jitter.
    pub fn polling_policy(&self) -> Box<dyn PollingPolicy> {
        Box::new(GenericPollingPolicy::new(
            Box::new(LimitedElapsedTime::new(self.poll_deadline)),
            Box::new(
                ExponentialBackoff::builder()
                    .initial_delay(self.initial_poll_delay)
                    .max_delay(self.max_poll_delay)
                    .jitter(0.0)
                    .build(),
            ),
        ))
    }

    /// The mutation idempotency policy this configuration describes.
    pub fn mutation_policy(&self) -> Box<dyn IdempotentMutationPolicy> {
        match self.mutation_mode {
            MutationMode::Safe => Box::new(SafeIdempotentMutationPolicy),
            MutationMode::AlwaysRetry => Box::new(AlwaysRetryMutationPolicy),
        }
    }
}

/// Builder for creating an [`AdminConfig`] with a fluent API.
#[derive(Debug, Default)]
pub struct AdminConfigBuilder {
    config: AdminConfig,
}

impl AdminConfigBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum attempts per logical RPC.
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.max_attempts = attempts;
        self
    }

    /// Limit each logical RPC by elapsed time instead of attempt count.
    pub fn retry_deadline(mut self, deadline: Duration) -> Self {
        self.config.retry_deadline = Some(deadline);
        self
    }

    /// Set the delay before the second attempt.
    pub fn initial_backoff(mut self, delay: Duration) -> Self {
        self.config.initial_backoff = delay;
        self
    }

    /// Set the ceiling on the delay between attempts.
    pub fn max_backoff(mut self, delay: Duration) -> Self {
        self.config.max_backoff = delay;
        self
    }

    /// Set the factor applied to the delay after each attempt.
    pub fn backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.config.backoff_multiplier = multiplier;
        self
    }

    /// Set the jitter fraction, in `[0.0, 1.0]`.
    pub fn backoff_jitter(mut self, jitter: f64) -> Self {
        self.config.backoff_jitter = jitter;
        self
    }

    /// Set the time budget for polling one long-running operation.
    pub fn poll_deadline(mut self, deadline: Duration) -> Self {
        self.config.poll_deadline = deadline;
        self
    }

    /// Set the delay before the first status re-check.
    pub fn initial_poll_delay(mut self, delay: Duration) -> Self {
        self.config.initial_poll_delay = delay;
        self
    }

    /// Set the ceiling on the delay between status checks.
    pub fn max_poll_delay(mut self, delay: Duration) -> Self {
        self.config.max_poll_delay = delay;
        self
    }

    /// Set which mutations are safe to retry.
    pub fn mutation_mode(mut self, mode: MutationMode) -> Self {
        self.config.mutation_mode = mode;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> AdminConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::idempotency::Idempotency;
    use trellis_core::{Error, StatusCode};

    fn unavailable() -> Error {
        Error::rpc(StatusCode::Unavailable, "try again")
    }

    #[test]
    fn test_default_config() {
        let config = AdminConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert!(config.retry_deadline.is_none());
        assert_eq!(config.initial_backoff, Duration::from_millis(100));
        assert_eq!(config.mutation_mode, MutationMode::Safe);
    }

    #[test]
    fn test_config_builder() {
        let config = AdminConfig::builder()
            .max_attempts(5)
            .initial_backoff(Duration::from_millis(10))
            .max_backoff(Duration::from_secs(1))
            .backoff_jitter(0.0)
            .poll_deadline(Duration::from_secs(30))
            .mutation_mode(MutationMode::AlwaysRetry)
            .build();

        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.initial_backoff, Duration::from_millis(10));
        assert_eq!(config.backoff_jitter, 0.0);
        assert_eq!(config.poll_deadline, Duration::from_secs(30));
        assert_eq!(config.mutation_mode, MutationMode::AlwaysRetry);
    }

    #[test]
    fn test_config_merge() {
        let base = AdminConfig::builder()
            .max_attempts(7)
            .initial_backoff(Duration::from_millis(5))
            .build();
        let overlay = AdminConfig::builder()
            .max_backoff(Duration::from_secs(2))
            .mutation_mode(MutationMode::AlwaysRetry)
            .build();

        let merged = base.merge(overlay);
        // Fields the overlay left at their defaults keep the base value.
        assert_eq!(merged.max_attempts, 7);
        assert_eq!(merged.initial_backoff, Duration::from_millis(5));
        // Fields the overlay changed win.
        assert_eq!(merged.max_backoff, Duration::from_secs(2));
        assert_eq!(merged.mutation_mode, MutationMode::AlwaysRetry);
    }

    #[test]
    fn test_retry_policy_counts_attempts_by_default() {
        let config = AdminConfig::builder().max_attempts(2).build();
        let mut policy = config.retry_policy();
        assert!(!policy.is_exhausted());
        let _ = policy.on_failure(unavailable());
        let _ = policy.on_failure(unavailable());
        assert!(policy.is_exhausted());
    }

    #[test]
    fn test_retry_deadline_takes_precedence_over_attempts() {
        let config = AdminConfig::builder()
            .max_attempts(1)
            .retry_deadline(Duration::from_secs(60))
            .build();
        let mut policy = config.retry_policy();
        // Under an attempt-count budget of 1 this first failure would
        // exhaust the policy; the deadline budget keeps going.
        let verdict = policy.on_failure(unavailable());
        assert!(verdict.is_continue());
    }

    #[test]
    fn test_backoff_policy_follows_the_configured_schedule() {
        let config = AdminConfig::builder()
            .initial_backoff(Duration::from_millis(10))
            .max_backoff(Duration::from_millis(25))
            .backoff_jitter(0.0)
            .build();
        let mut backoff = config.backoff_policy();
        assert_eq!(backoff.next_delay(), Duration::from_millis(10));
        assert_eq!(backoff.next_delay(), Duration::from_millis(20));
        assert_eq!(backoff.next_delay(), Duration::from_millis(25));
    }

    #[test]
    fn test_mutation_mode_selects_the_policy() {
        let safe = AdminConfig::default().mutation_policy();
        assert_eq!(
            safe.effective(Idempotency::NonIdempotent),
            Idempotency::NonIdempotent
        );

        let always = AdminConfig::builder()
            .mutation_mode(MutationMode::AlwaysRetry)
            .build()
            .mutation_policy();
        assert_eq!(
            always.effective(Idempotency::NonIdempotent),
            Idempotency::Idempotent
        );
    }

    #[cfg(feature = "env")]
    #[test]
    fn test_from_env_reads_overrides() {
        temp_env::with_vars(
            [
                ("TRELLIS_MAX_ATTEMPTS", Some("6")),
                ("TRELLIS_INITIAL_BACKOFF_MS", Some("250")),
                ("TRELLIS_MUTATION_MODE", Some("always-retry")),
            ],
            || {
                let config = AdminConfig::from_env();
                assert_eq!(config.max_attempts, 6);
                assert_eq!(config.initial_backoff, Duration::from_millis(250));
                assert_eq!(config.mutation_mode, MutationMode::AlwaysRetry);
                // Untouched variables keep their defaults.
                assert_eq!(config.max_backoff, Duration::from_secs(60));
            },
        );
    }

    #[cfg(feature = "env")]
    #[test]
    fn test_from_env_ignores_garbage() {
        temp_env::with_vars(
            [
                ("TRELLIS_MAX_ATTEMPTS", Some("not-a-number")),
                ("TRELLIS_MUTATION_MODE", Some("yolo")),
            ],
            || {
                let config = AdminConfig::from_env();
                assert_eq!(config.max_attempts, 3);
                assert_eq!(config.mutation_mode, MutationMode::Safe);
            },
        );
    }
}
