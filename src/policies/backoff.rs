//! # Backoff policy for reconnect attempts.
//!
//! [`BackoffPolicy`] controls how the wait before the next connection attempt grows
//! after repeated failures. It is parameterized by:
//! - [`BackoffPolicy::first`] the initial delay (attempt `0`);
//! - [`BackoffPolicy::factor`] the multiplicative growth factor;
//! - [`BackoffPolicy::max`] the maximum delay cap;
//! - [`BackoffPolicy::jitter`] optional randomization.
//!
//! The deterministic delay for attempt `n` is `first × factor^n`, clamped to `max`
//! ([`BackoffPolicy::delay_for_attempt`]). Jitter is layered on top by
//! [`BackoffPolicy::next`] and never drops below `first`, so an endpoint that fails
//! immediately can not turn the supervisor into a hot retry loop.
//!
//! ## Normalization
//! - `first == 0` is raised to 1ms;
//! - `factor < 1.0` (or non-finite) behaves as `1.0`, delays never shrink;
//! - `max < first` is raised to `first`.
//!
//! With these rules `first <= delay_for_attempt(n) <= delay_for_attempt(n + 1) <= max`.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use sockvisor::{BackoffPolicy, JitterPolicy};
//!
//! let backoff = BackoffPolicy {
//!     first: Duration::from_millis(100),
//!     max: Duration::from_secs(10),
//!     factor: 2.0,
//!     jitter: JitterPolicy::None,
//! };
//!
//! assert_eq!(backoff.delay_for_attempt(0), Duration::from_millis(100));
//! assert_eq!(backoff.delay_for_attempt(1), Duration::from_millis(200));
//! // 100ms × 2^10 = 102_400ms → capped at max=10s
//! assert_eq!(backoff.delay_for_attempt(10), Duration::from_secs(10));
//! ```

use std::time::Duration;

use crate::policies::jitter::JitterPolicy;

/// Smallest delay the policy ever yields.
const MIN_DELAY: Duration = Duration::from_millis(1);

/// Reconnect backoff policy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackoffPolicy {
    /// Delay before the first retry.
    pub first: Duration,
    /// Maximum delay cap for retries.
    pub max: Duration,
    /// Multiplicative growth factor (`>= 1.0`).
    pub factor: f64,
    /// Jitter policy to spread reconnect storms across many clients.
    pub jitter: JitterPolicy,
}

impl Default for BackoffPolicy {
    /// Returns a policy with:
    /// - `first = 5s`;
    /// - `factor = 2.0`;
    /// - `max = 60s`;
    /// - `jitter = None`.
    fn default() -> Self {
        Self {
            first: Duration::from_secs(5),
            max: Duration::from_secs(60),
            factor: 2.0,
            jitter: JitterPolicy::None,
        }
    }
}

impl BackoffPolicy {
    /// Exponential policy without jitter.
    pub fn exponential(first: Duration, max: Duration) -> Self {
        Self {
            first,
            max,
            factor: 2.0,
            jitter: JitterPolicy::None,
        }
    }

    /// Returns the same policy with the given jitter.
    pub fn with_jitter(mut self, jitter: JitterPolicy) -> Self {
        self.jitter = jitter;
        self
    }

    /// Smallest delay this policy yields (normalized `first`).
    #[inline]
    pub fn floor(&self) -> Duration {
        self.first.max(MIN_DELAY)
    }

    /// Largest delay this policy yields (normalized `max`).
    #[inline]
    pub fn ceiling(&self) -> Duration {
        self.max.max(self.floor())
    }

    /// Computes the deterministic delay for the given attempt number (0-indexed).
    ///
    /// The result is `first × factor^attempt`, clamped into `[floor, ceiling]`.
    /// Non-finite intermediate values (huge attempts) clamp to the ceiling.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let floor = self.floor();
        let ceiling = self.ceiling();

        let factor = if self.factor.is_finite() && self.factor >= 1.0 {
            self.factor
        } else {
            1.0
        };
        let clamped_exp = attempt.min(i32::MAX as u32) as i32;
        let unclamped_secs = floor.as_secs_f64() * factor.powi(clamped_exp);

        if !unclamped_secs.is_finite() || unclamped_secs >= ceiling.as_secs_f64() {
            ceiling
        } else {
            Duration::from_secs_f64(unclamped_secs).clamp(floor, ceiling)
        }
    }

    /// Computes the delay actually waited before the next attempt.
    ///
    /// Applies [`BackoffPolicy::jitter`] to [`delay_for_attempt`](Self::delay_for_attempt)
    /// and floors the result at [`floor`](Self::floor). Jittered output never feeds
    /// back into later calculations.
    pub fn next(&self, attempt: u32) -> Duration {
        let base = self.delay_for_attempt(attempt);
        self.jitter.apply(base).max(self.floor())
    }
}
