use std::time::Duration;

use crate::error::PolicyError;

/// Attempt budget used when none is configured.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;
/// Delay before the second attempt when none is configured.
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(2);
/// Growth factor applied after every failed attempt when none is configured.
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;

/// How many times an operation is attempted and how long to wait in between.
///
/// The delay after failed attempt `n` (1-based) is
/// `initial_delay * backoff_multiplier^(n - 1)`, clamped to `max_delay` when one is set.
/// No delay is ever computed for the final attempt.
///
/// Delays strictly increase between attempts only when `backoff_multiplier > 1.0` and no
/// `max_delay` is set: a multiplier of exactly `1.0` gives a fixed delay, and once the cap is
/// reached every later delay equals the cap.
///
/// A policy is validated on construction and cannot be changed afterwards.
///
/// ```
/// use std::time::Duration;
/// use reprise::RetryPolicy;
///
/// let policy = RetryPolicy::new(3, Duration::from_secs(2), 2.0).unwrap();
/// assert_eq!(policy.delay_after(1), Duration::from_secs(2));
/// assert_eq!(policy.delay_after(2), Duration::from_secs(4));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_delay: Duration,
    backoff_multiplier: f64,
    max_delay: Option<Duration>,
}

impl Default for RetryPolicy {
    /// Ten attempts, starting at two seconds and doubling.
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_delay: DEFAULT_INITIAL_DELAY,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            max_delay: None,
        }
    }
}

impl RetryPolicy {
    pub fn new(
        max_attempts: u32,
        initial_delay: Duration,
        backoff_multiplier: f64,
    ) -> Result<Self, PolicyError> {
        if max_attempts == 0 {
            return Err(PolicyError::ZeroAttempts);
        }
        if !backoff_multiplier.is_finite() || backoff_multiplier < 1.0 {
            return Err(PolicyError::InvalidMultiplier(backoff_multiplier));
        }
        Ok(Self {
            max_attempts,
            initial_delay,
            backoff_multiplier,
            max_delay: None,
        })
    }
    /// A policy that runs the operation exactly once.
    pub fn once() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }
    /// Cap the delay between attempts even when the calculated backoff is larger.
    pub fn with_max_delay(mut self, dur: Duration) -> Self {
        self.max_delay = Some(dur);
        self
    }
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }
    pub fn backoff_multiplier(&self) -> f64 {
        self.backoff_multiplier
    }
    pub fn max_delay(&self) -> Option<Duration> {
        self.max_delay
    }
    /// Delay to wait after failed attempt `attempt` (1-based) before the next one.
    ///
    /// Whole-number multipliers are applied with exact `Duration` arithmetic. Fractional
    /// multipliers go through `f64` seconds and carry its precision. Either way the result
    /// saturates at [`Duration::MAX`] (or the configured cap) instead of overflowing.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1);
        let m = self.backoff_multiplier;

        let delay = if exp == 0 || m == 1.0 || self.initial_delay.is_zero() {
            self.initial_delay
        } else if m.fract() == 0.0 && m <= u32::MAX as f64 {
            self.scale_exact(m as u32, exp)
        } else {
            let secs = self.initial_delay.as_secs_f64() * m.powi(exp.min(i32::MAX as u32) as i32);
            Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
        };

        self.max_delay.map_or(delay, |max| max.min(delay))
    }
    /// `initial_delay * factor^exp` for `factor >= 2`, stopping once it saturates or hits the cap.
    fn scale_exact(&self, factor: u32, exp: u32) -> Duration {
        let mut delay = self.initial_delay;
        for _ in 0..exp {
            delay = match delay.checked_mul(factor) {
                Some(next) => next,
                None => return Duration::MAX,
            };
            if self.max_delay.is_some_and(|max| delay >= max) {
                break;
            }
        }
        delay
    }
    /// Sum of all delays slept when the operation succeeds on attempt `attempt`.
    pub fn total_delay_before(&self, attempt: u32) -> Duration {
        (1..attempt.min(self.max_attempts))
            .map(|n| self.delay_after(n))
            .fold(Duration::ZERO, Duration::saturating_add)
    }
}
