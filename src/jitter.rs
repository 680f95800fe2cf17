use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Randomizes a computed backoff delay before the driver sleeps on it.
pub trait Jitter {
    fn jitter(&mut self, delay: Duration) -> Duration;
}

/// Sleep exactly the computed delay.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoJitter;

impl Jitter for NoJitter {
    fn jitter(&mut self, delay: Duration) -> Duration {
        delay
    }
}

/// Random delay between zero and the computed delay.
#[derive(Debug, Clone, Copy, Default)]
pub struct Full;

impl Jitter for Full {
    fn jitter(&mut self, delay: Duration) -> Duration {
        rand::thread_rng().gen_range(Duration::ZERO..=delay)
    }
}

/// Random delay between half the computed delay and the computed delay.
#[derive(Debug, Clone, Copy, Default)]
pub struct Equal;

impl Jitter for Equal {
    fn jitter(&mut self, delay: Duration) -> Duration {
        rand::thread_rng().gen_range((delay / 2)..=delay)
    }
}

/// Jitter selected at runtime, e.g. from a config file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JitterKind {
    #[default]
    None,
    Full,
    Equal,
}

impl Jitter for JitterKind {
    fn jitter(&mut self, delay: Duration) -> Duration {
        match self {
            JitterKind::None => NoJitter.jitter(delay),
            JitterKind::Full => Full.jitter(delay),
            JitterKind::Equal => Equal.jitter(delay),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_jitter_is_identity() {
        let delay = Duration::from_millis(1500);
        assert_eq!(NoJitter.jitter(delay), delay);
        assert_eq!(JitterKind::None.jitter(delay), delay);
    }

    #[test]
    fn full_stays_within_delay() {
        let delay = Duration::from_secs(4);
        for _ in 0..200 {
            assert!(Full.jitter(delay) <= delay);
        }
    }

    #[test]
    fn equal_stays_in_upper_half() {
        let delay = Duration::from_secs(4);
        for _ in 0..200 {
            let jittered = Equal.jitter(delay);
            assert!(jittered >= Duration::from_secs(2), "{jittered:?} below half");
            assert!(jittered <= delay, "{jittered:?} above delay");
        }
    }

    #[test]
    fn zero_delay_stays_zero() {
        assert_eq!(Full.jitter(Duration::ZERO), Duration::ZERO);
        assert_eq!(Equal.jitter(Duration::ZERO), Duration::ZERO);
    }

    #[test]
    fn kind_parses_snake_case() {
        let kind: JitterKind = serde_json::from_str("\"equal\"").unwrap();
        assert_eq!(kind, JitterKind::Equal);
    }
}
