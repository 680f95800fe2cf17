use std::{fmt, time::Duration};

/// Verdict of a single invocation of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    Succeeded,
    /// Failed, but safe to try again.
    Failed,
    /// Failed in a way that retrying cannot fix. Stops the driver without sleeping.
    Abort,
}

/// Anything an operation may return that maps onto an [`Attempt`].
///
/// Payloads are dropped: the driver only sees success or failure. Callers that need the
/// value write it somewhere the closure captured.
pub trait IntoAttempt {
    fn into_attempt(self) -> Attempt;
}

impl IntoAttempt for Attempt {
    fn into_attempt(self) -> Attempt {
        self
    }
}

impl IntoAttempt for bool {
    fn into_attempt(self) -> Attempt {
        if self {
            Attempt::Succeeded
        } else {
            Attempt::Failed
        }
    }
}

impl<T, E> IntoAttempt for Result<T, E> {
    fn into_attempt(self) -> Attempt {
        match self {
            Ok(_) => Attempt::Succeeded,
            Err(_) => Attempt::Failed,
        }
    }
}

/// How a driver invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// Every attempt allowed by the policy failed.
    Exhausted,
    /// The operation returned [`Attempt::Abort`].
    Aborted,
    /// The cancellation token fired before an attempt or a sleep.
    Cancelled,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Outcome::Success => "succeeded",
            Outcome::Exhausted => "exhausted",
            Outcome::Aborted => "aborted",
            Outcome::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Result of one call to [`Retry::run`](crate::Retry::run) or `run_async`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Report {
    pub outcome: Outcome,
    /// Number of times the operation was invoked.
    pub attempts: u32,
    /// Total time spent in completed sleeps between attempts.
    pub slept: Duration,
}

impl Report {
    pub fn succeeded(&self) -> bool {
        self.outcome == Outcome::Success
    }
}

impl From<Report> for bool {
    fn from(report: Report) -> bool {
        report.succeeded()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let noun = if self.attempts == 1 { "attempt" } else { "attempts" };
        write!(
            f,
            "{} after {} {} ({:?} waiting)",
            self.outcome, self.attempts, noun, self.slept
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_and_result_map_onto_attempts() {
        assert_eq!(true.into_attempt(), Attempt::Succeeded);
        assert_eq!(false.into_attempt(), Attempt::Failed);
        assert_eq!(Ok::<_, ()>(42).into_attempt(), Attempt::Succeeded);
        assert_eq!(Err::<(), _>("boom").into_attempt(), Attempt::Failed);
        assert_eq!(Attempt::Abort.into_attempt(), Attempt::Abort);
    }

    #[test]
    fn only_success_is_true() {
        let mut report = Report {
            outcome: Outcome::Success,
            attempts: 1,
            slept: Duration::ZERO,
        };
        assert!(bool::from(report));
        for outcome in [Outcome::Exhausted, Outcome::Aborted, Outcome::Cancelled] {
            report.outcome = outcome;
            assert!(!report.succeeded());
        }
    }

    #[test]
    fn display_reads_naturally() {
        let report = Report {
            outcome: Outcome::Exhausted,
            attempts: 3,
            slept: Duration::from_secs(6),
        };
        assert_eq!(report.to_string(), "exhausted after 3 attempts (6s waiting)");
    }
}
