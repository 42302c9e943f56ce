//! Exponential backoff with jitter.

use std::time::Duration;

/// Computes the delay to wait before the next attempt.
///
/// Backoff policies are stateful: each consultation returns a delay and
/// advances the internal schedule, so consecutive delays grow. Like retry
/// policies, an instance belongs to one logical operation and
/// [`BackoffPolicy::clone_policy`] produces a fresh copy starting from the
/// initial delay.
pub trait BackoffPolicy: Send + Sync + std::fmt::Debug {
    /// The delay before the next attempt. Advances the schedule.
    fn next_delay(&mut self) -> Duration;

    /// A fresh copy of this policy, restarted at the initial delay.
    fn clone_policy(&self) -> Box<dyn BackoffPolicy>;
}

/// Exponential backoff policy with configurable jitter.
///
/// Each consultation returns the current delay and then scales it by
/// `multiplier`, capped at `max_delay`. Jitter randomizes the returned
/// delay to prevent thundering herd problems: a jitter of 0.1 means the
/// delay can vary by ±10%. The jittered delay is still capped at
/// `max_delay`.
///
/// # Examples
///
/// ```rust
/// use trellis_core::retry::{BackoffPolicy, ExponentialBackoff};
/// use std::time::Duration;
///
/// // Default configuration (initial=100ms, max=60s, multiplier=2.0, jitter=0.1)
/// let backoff = ExponentialBackoff::default();
///
/// // Custom configuration
/// let mut backoff = ExponentialBackoff::builder()
///     .initial_delay(Duration::from_millis(10))
///     .max_delay(Duration::from_secs(30))
///     .multiplier(2.0)
///     .jitter(0.0)
///     .build();
///
/// assert_eq!(backoff.next_delay(), Duration::from_millis(10));
/// assert_eq!(backoff.next_delay(), Duration::from_millis(20));
/// ```
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    initial_delay: Duration,
    max_delay: Duration,
    multiplier: f64,
    jitter: f64,
    current_delay: Duration,
}

impl ExponentialBackoff {
    /// Create a new builder for configuring exponential backoff.
    pub fn builder() -> ExponentialBackoffBuilder {
        ExponentialBackoffBuilder::default()
    }
}

impl Default for ExponentialBackoff {
    /// Create an exponential backoff with sensible defaults.
    ///
    /// Defaults:
    /// - `initial_delay`: 100ms
    /// - `max_delay`: 60s
    /// - `multiplier`: 2.0 (doubles each time)
    /// - `jitter`: 0.1 (10% randomization)
    fn default() -> Self {
        ExponentialBackoffBuilder::default().build()
    }
}

impl BackoffPolicy for ExponentialBackoff {
    fn next_delay(&mut self) -> Duration {
        let base = self.current_delay;

        // Advance the schedule for the next consultation.
        let scaled = base.as_secs_f64() * self.multiplier;
        self.current_delay =
            Duration::from_secs_f64(scaled.min(self.max_delay.as_secs_f64()));

        if self.jitter <= 0.0 {
            return base;
        }

        // Jitter is applied as: base * jitter * random(-1.0, +1.0)
        // This gives a range of [base * (1 - jitter), base * (1 + jitter)]
        let base_secs = base.as_secs_f64();
        let jittered = base_secs + base_secs * self.jitter * (rand::random::<f64>() - 0.5) * 2.0;
        Duration::from_secs_f64(jittered.min(self.max_delay.as_secs_f64()))
    }

    fn clone_policy(&self) -> Box<dyn BackoffPolicy> {
        Box::new(Self {
            current_delay: self.initial_delay,
            ..self.clone()
        })
    }
}

/// Builder for configuring `ExponentialBackoff`.
///
/// # Examples
///
/// ```rust
/// use trellis_core::retry::ExponentialBackoff;
/// use std::time::Duration;
///
/// let backoff = ExponentialBackoff::builder()
///     .initial_delay(Duration::from_millis(100))
///     .max_delay(Duration::from_secs(30))
///     .multiplier(2.0)
///     .jitter(0.1)
///     .build();
/// ```
#[derive(Debug, Default)]
pub struct ExponentialBackoffBuilder {
    initial_delay: Option<Duration>,
    max_delay: Option<Duration>,
    multiplier: Option<f64>,
    jitter: Option<f64>,
}

impl ExponentialBackoffBuilder {
    /// Set the delay before the first retry.
    ///
    /// Default: 100ms
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = Some(delay);
        self
    }

    /// Set the maximum delay between retries.
    ///
    /// Default: 60s
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = Some(delay);
        self
    }

    /// Set the exponential multiplier.
    ///
    /// Each consultation scales the delay by this factor. Values below 1.0
    /// are clamped to 1.0 so the delay never shrinks.
    ///
    /// Default: 2.0 (doubles each time)
    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = Some(multiplier.max(1.0));
        self
    }

    /// Set the jitter factor (0.0 to 1.0).
    ///
    /// Jitter adds randomness to prevent thundering herd. A jitter of 0.1
    /// means the delay can vary by ±10%.
    ///
    /// Default: 0.1
    pub fn jitter(mut self, jitter: f64) -> Self {
        self.jitter = Some(jitter.clamp(0.0, 1.0));
        self
    }

    /// Build the `ExponentialBackoff` instance.
    ///
    /// Uses default values for any unset parameters. If `max_delay` is
    /// below `initial_delay` it is raised to match.
    pub fn build(self) -> ExponentialBackoff {
        let initial_delay = self.initial_delay.unwrap_or(Duration::from_millis(100));
        let max_delay = self.max_delay.unwrap_or(Duration::from_secs(60)).max(initial_delay);
        ExponentialBackoff {
            initial_delay,
            max_delay,
            multiplier: self.multiplier.unwrap_or(2.0),
            jitter: self.jitter.unwrap_or(0.1),
            current_delay: initial_delay,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn without_jitter(initial: Duration, max: Duration, multiplier: f64) -> ExponentialBackoff {
        ExponentialBackoff::builder()
            .initial_delay(initial)
            .max_delay(max)
            .multiplier(multiplier)
            .jitter(0.0)
            .build()
    }

    #[test]
    fn test_delay_doubles_until_cap() {
        let mut backoff = without_jitter(
            Duration::from_millis(100),
            Duration::from_millis(350),
            2.0,
        );

        assert_eq!(backoff.next_delay(), Duration::from_millis(100));
        assert_eq!(backoff.next_delay(), Duration::from_millis(200));
        assert_eq!(backoff.next_delay(), Duration::from_millis(350));
        assert_eq!(backoff.next_delay(), Duration::from_millis(350));
        assert_eq!(backoff.next_delay(), Duration::from_millis(350));
    }

    #[test]
    fn test_jitter_variation() {
        let backoff = ExponentialBackoff::builder()
            .initial_delay(Duration::from_secs(1))
            .max_delay(Duration::from_secs(60))
            .jitter(0.5)
            .build();

        // Sample the first delay repeatedly via fresh clones.
        let mut delays = Vec::new();
        for _ in 0..20 {
            delays.push(backoff.clone_policy().next_delay());
        }

        // With 50% jitter, delays should be between 0.5s and 1.5s
        for delay in &delays {
            let millis = delay.as_millis();
            assert!(
                (500..=1500).contains(&millis),
                "delay with 50% jitter should be in [500ms, 1500ms], got {}ms",
                millis
            );
        }

        // Check that not all delays are identical (very unlikely with jitter)
        let all_same = delays.windows(2).all(|w| w[0] == w[1]);
        assert!(!all_same, "with randomization, delays should vary");
    }

    #[test]
    fn test_jitter_never_exceeds_max_delay() {
        let mut backoff = ExponentialBackoff::builder()
            .initial_delay(Duration::from_secs(1))
            .max_delay(Duration::from_secs(1))
            .jitter(1.0)
            .build();

        for _ in 0..50 {
            assert!(backoff.next_delay() <= Duration::from_secs(1));
        }
    }

    #[test]
    fn test_clone_restarts_at_initial_delay() {
        let mut backoff = without_jitter(
            Duration::from_millis(100),
            Duration::from_secs(10),
            2.0,
        );
        let _ = backoff.next_delay();
        let _ = backoff.next_delay();
        assert_eq!(backoff.next_delay(), Duration::from_millis(400));

        let mut clone = backoff.clone_policy();
        assert_eq!(clone.next_delay(), Duration::from_millis(100));
    }

    #[test]
    fn test_builder_defaults() {
        let backoff = ExponentialBackoff::default();

        assert_eq!(backoff.initial_delay, Duration::from_millis(100));
        assert_eq!(backoff.max_delay, Duration::from_secs(60));
        assert_eq!(backoff.multiplier, 2.0);
        assert_eq!(backoff.jitter, 0.1);
        assert_eq!(backoff.current_delay, backoff.initial_delay);
    }

    #[test]
    fn test_builder_clamps() {
        // Jitter outside [0, 1] is clamped.
        let backoff = ExponentialBackoff::builder().jitter(2.0).build();
        assert_eq!(backoff.jitter, 1.0);
        let backoff = ExponentialBackoff::builder().jitter(-0.5).build();
        assert_eq!(backoff.jitter, 0.0);

        // Multipliers below one would shrink the delay.
        let backoff = ExponentialBackoff::builder().multiplier(0.5).build();
        assert_eq!(backoff.multiplier, 1.0);

        // A cap below the initial delay is raised to match.
        let backoff = ExponentialBackoff::builder()
            .initial_delay(Duration::from_secs(2))
            .max_delay(Duration::from_secs(1))
            .build();
        assert_eq!(backoff.max_delay, Duration::from_secs(2));
    }
}
