use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{
    backoff::{DEFAULT_BACKOFF_MULTIPLIER, DEFAULT_INITIAL_DELAY, DEFAULT_MAX_ATTEMPTS},
    error::PolicyError,
    jitter::JitterKind,
    Retry, RetryPolicy,
};

/// Serializable retry settings, e.g. one entry per step of a setup file.
///
/// Missing fields take the defaults of [`RetryPolicy::default`].
///
/// ```
/// let config: reprise::RetryConfig =
///     serde_json::from_str(r#"{ "max_attempts": 3, "jitter": "full" }"#).unwrap();
/// let policy = reprise::RetryPolicy::try_from(config).unwrap();
/// assert_eq!(policy.max_attempts(), 3);
/// assert_eq!(policy.initial_delay(), std::time::Duration::from_secs(2));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub backoff_multiplier: f64,
    /// Upper bound for a single delay, if any.
    pub max_delay_ms: Option<u64>,
    pub jitter: JitterKind,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_delay_ms: whole_millis(DEFAULT_INITIAL_DELAY),
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            max_delay_ms: None,
            jitter: JitterKind::None,
        }
    }
}

impl RetryConfig {
    /// Validates the settings and builds a driver using the configured jitter.
    pub fn into_retry(self) -> Result<Retry<JitterKind>, PolicyError> {
        let jitter = self.jitter;
        let policy = RetryPolicy::try_from(self)?;
        Ok(crate::with_policy(policy).jitter(jitter))
    }
}

impl TryFrom<RetryConfig> for RetryPolicy {
    type Error = PolicyError;

    fn try_from(config: RetryConfig) -> Result<Self, Self::Error> {
        let policy = RetryPolicy::new(
            config.max_attempts,
            Duration::from_millis(config.initial_delay_ms),
            config.backoff_multiplier,
        )?;
        Ok(match config.max_delay_ms {
            Some(ms) => policy.with_max_delay(Duration::from_millis(ms)),
            None => policy,
        })
    }
}

/// Whole milliseconds in `dur`, truncating any sub-millisecond part and saturating at `u64::MAX`.
fn whole_millis(dur: Duration) -> u64 {
    u64::try_from(dur.as_millis()).unwrap_or(u64::MAX)
}

/// Delays are stored in whole milliseconds, so sub-millisecond parts are dropped and delays
/// beyond `u64::MAX` milliseconds are clamped to it.
impl From<RetryPolicy> for RetryConfig {
    fn from(policy: RetryPolicy) -> Self {
        Self {
            max_attempts: policy.max_attempts(),
            initial_delay_ms: whole_millis(policy.initial_delay()),
            backoff_multiplier: policy.backoff_multiplier(),
            max_delay_ms: policy.max_delay().map(whole_millis),
            jitter: JitterKind::None,
        }
    }
}
