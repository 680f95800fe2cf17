#![allow(clippy::type_complexity)]

pub mod backoff;
pub mod command;
pub mod config;
pub mod error;
pub mod jitter;
pub mod outcome;
pub mod sleep;
pub mod workflow;

use std::{ops::ControlFlow, time::Duration};

pub use backoff::RetryPolicy;
pub use command::{Captured, Command};
pub use config::RetryConfig;
pub use error::{PolicyError, WorkflowError};
pub use jitter::{Equal, Full, Jitter, JitterKind, NoJitter};
pub use outcome::{Attempt, IntoAttempt, Outcome, Report};
pub use sleep::{Sleep, ThreadSleep};
pub use tokio_util::sync::CancellationToken;
pub use workflow::{Criticality, Step, StepRecord, Summary, Workflow};

/// Retries an operation with the default policy: 10 attempts, 2s initial delay, doubling.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// fn lookup_stack_output() -> std::io::Result<String> {
///     Err(std::io::Error::other("stack not ready"))
/// }
///
/// let report = reprise::retry()
///     .sleeper(|_: Duration| {})
///     .run(|| lookup_stack_output());
/// assert!(!report.succeeded());
/// assert_eq!(report.attempts, 10);
/// ```
pub fn retry() -> Retry {
    with_policy(RetryPolicy::default())
}

/// Retries an operation with the given policy.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use reprise::RetryPolicy;
///
/// let policy = RetryPolicy::new(3, Duration::from_millis(1), 2.0).unwrap();
/// let mut calls = 0;
/// let report = reprise::with_policy(policy).run(|| {
///     calls += 1;
///     calls == 2
/// });
/// assert!(report.succeeded());
/// assert_eq!(report.attempts, 2);
/// ```
pub fn with_policy(policy: RetryPolicy) -> Retry {
    Retry {
        policy,
        jitterable: NoJitter,
        sleeper: ThreadSleep,
        cancel: None,
        before_attempt: None,
        after_attempt: None,
    }
}

/// Not meant to be constructed directly. Use `reprise::retry()` or `reprise::with_policy(...)`.
///
/// A `Retry` is consumed by [`Retry::run`] or [`Retry::run_async`], so the attempt counter and
/// the delay state of one invocation are never visible to another.
pub struct Retry<Jit = NoJitter, Sl = ThreadSleep>
where
    Jit: Jitter,
{
    policy: RetryPolicy,
    jitterable: Jit,
    sleeper: Sl,
    cancel: Option<CancellationToken>,
    before_attempt: Option<Box<dyn Fn(u32) + Send + Sync + 'static>>,
    after_attempt: Option<Box<dyn Fn(Attempt, u32) + Send + Sync + 'static>>,
}

impl<Jit, Sl> Retry<Jit, Sl>
where
    Jit: Jitter,
{
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
    /// Sets the function called before every attempt, including the first, with the
    /// 1-based attempt number.
    pub fn before_attempt<F>(mut self, before_attempt: F) -> Self
    where
        F: Fn(u32) + Send + Sync + 'static,
    {
        self.before_attempt = Some(Box::new(before_attempt));
        self
    }
    /// Sets the function called after every attempt with its verdict and 1-based number.
    pub fn after_attempt<F>(mut self, after_attempt: F) -> Self
    where
        F: Fn(Attempt, u32) + Send + Sync + 'static,
    {
        self.after_attempt = Some(Box::new(after_attempt));
        self
    }
    /// Stop before the next attempt or sleep once `token` is cancelled.
    pub fn cancel_on(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
    /// Adjust the backoff by the provided jitter strategy
    pub fn jitter<J>(self, jitter: J) -> Retry<J, Sl>
    where
        J: Jitter,
    {
        Retry {
            policy: self.policy,
            jitterable: jitter,
            sleeper: self.sleeper,
            cancel: self.cancel,
            before_attempt: self.before_attempt,
            after_attempt: self.after_attempt,
        }
    }
    /// Adjust the calculated backoff by choosing a random delay between 0 and the backoff value
    pub fn full_jitter(self) -> Retry<Full, Sl> {
        self.jitter(Full)
    }
    /// Adjust the calculated backoff by choosing a random delay between backoff / 2 and the backoff value
    pub fn equal_jitter(self) -> Retry<Equal, Sl> {
        self.jitter(Equal)
    }
    /// Suspend [`Retry::run`] with `sleeper` instead of blocking the thread.
    ///
    /// Only the blocking driver uses it. `run_async` always waits on the runtime's timer.
    pub fn sleeper<S>(self, sleeper: S) -> Retry<Jit, S>
    where
        S: Sleep,
    {
        Retry {
            policy: self.policy,
            jitterable: self.jitterable,
            sleeper,
            cancel: self.cancel,
            before_attempt: self.before_attempt,
            after_attempt: self.after_attempt,
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|token| token.is_cancelled())
    }
    /// Runs the hooks around `verdict` and decides whether to stop or how long to wait.
    fn settle(&mut self, verdict: Attempt, attempt: u32) -> ControlFlow<Outcome, Duration> {
        if let Some(after_attempt) = &self.after_attempt {
            after_attempt(verdict, attempt);
        }
        match verdict {
            Attempt::Succeeded => ControlFlow::Break(Outcome::Success),
            Attempt::Abort => ControlFlow::Break(Outcome::Aborted),
            Attempt::Failed if attempt >= self.policy.max_attempts() => {
                ControlFlow::Break(Outcome::Exhausted)
            }
            Attempt::Failed => {
                let delay = self.jitterable.jitter(self.policy.delay_after(attempt));
                tracing::debug!(attempt, ?delay, "attempt failed, backing off");
                ControlFlow::Continue(delay)
            }
        }
    }
    fn begin(&self, attempt: u32) {
        tracing::trace!(attempt, max_attempts = self.policy.max_attempts(), "starting attempt");
        if let Some(before_attempt) = &self.before_attempt {
            before_attempt(attempt);
        }
    }
    fn finish(outcome: Outcome, attempts: u32, slept: Duration) -> Report {
        let report = Report {
            outcome,
            attempts,
            slept,
        };
        if outcome != Outcome::Success {
            tracing::debug!(%report, "retry loop stopped without success");
        }
        report
    }
}

impl<Jit, Sl> Retry<Jit, Sl>
where
    Jit: Jitter,
    Sl: Sleep,
{
    /// Invokes `f` until it succeeds, aborts, or the policy's attempt budget is spent,
    /// blocking the calling thread between failed attempts.
    ///
    /// No delay follows the final attempt.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    /// use reprise::{Outcome, RetryPolicy};
    ///
    /// let policy = RetryPolicy::new(3, Duration::from_secs(2), 2.0).unwrap();
    /// let mut waits = Vec::new();
    /// let report = reprise::with_policy(policy)
    ///     .sleeper(|d: Duration| waits.push(d))
    ///     .run(|| false);
    /// assert_eq!(report.outcome, Outcome::Exhausted);
    /// assert_eq!(waits, [Duration::from_secs(2), Duration::from_secs(4)]);
    /// ```
    pub fn run<F, R>(mut self, mut f: F) -> Report
    where
        F: FnMut() -> R,
        R: IntoAttempt,
    {
        let mut attempt: u32 = 1;
        let mut slept = Duration::ZERO;
        loop {
            if self.is_cancelled() {
                return Self::finish(Outcome::Cancelled, attempt - 1, slept);
            }
            self.begin(attempt);

            let verdict = f().into_attempt();

            let delay = match self.settle(verdict, attempt) {
                ControlFlow::Break(outcome) => return Self::finish(outcome, attempt, slept),
                ControlFlow::Continue(delay) => delay,
            };

            if self.is_cancelled() {
                return Self::finish(Outcome::Cancelled, attempt, slept);
            }
            self.sleeper.sleep(delay);
            slept = slept.saturating_add(delay);
            attempt += 1;
        }
    }
}

#[cfg(any(feature = "tokio", feature = "async-std"))]
impl<Jit, Sl> Retry<Jit, Sl>
where
    Jit: Jitter,
{
    /// Awaits `f` until it succeeds, aborts, or the policy's attempt budget is spent,
    /// sleeping on the runtime's timer between failed attempts.
    ///
    /// With the `tokio` feature a cancellation that fires during a sleep ends the sleep early.
    /// With `async-std` alone the sleep runs to completion, counts towards [`Report::slept`],
    /// and the cancellation is reported before the next attempt.
    ///
    /// A sleeper set with [`Retry::sleeper`] is not used here.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    /// use reprise::RetryPolicy;
    ///
    /// async fn fetch_secret() -> Result<String, std::io::Error> {
    ///     Ok("hunter2".to_string())
    /// }
    ///
    /// # async fn example() {
    /// let policy = RetryPolicy::new(5, Duration::from_millis(100), 2.0).unwrap();
    /// let report = reprise::with_policy(policy)
    ///     .run_async(async || fetch_secret().await)
    ///     .await;
    /// assert!(report.succeeded());
    /// # }
    /// ```
    pub async fn run_async<F, R>(mut self, mut f: F) -> Report
    where
        F: AsyncFnMut() -> R,
        R: IntoAttempt,
    {
        let mut attempt: u32 = 1;
        let mut slept = Duration::ZERO;
        loop {
            if self.is_cancelled() {
                return Self::finish(Outcome::Cancelled, attempt - 1, slept);
            }
            self.begin(attempt);

            let verdict = f().await.into_attempt();

            let delay = match self.settle(verdict, attempt) {
                ControlFlow::Break(outcome) => return Self::finish(outcome, attempt, slept),
                ControlFlow::Continue(delay) => delay,
            };

            if self.is_cancelled() || !Self::sleep(delay, self.cancel.as_ref()).await {
                return Self::finish(Outcome::Cancelled, attempt, slept);
            }
            slept = slept.saturating_add(delay);
            attempt += 1;
        }
    }

    /// Returns `true` when the full delay elapsed, `false` when cancellation cut it short.
    #[cfg(feature = "tokio")]
    async fn sleep(dur: Duration, cancel: Option<&CancellationToken>) -> bool {
        let sleep = tokio::time::sleep(dur);
        tokio::pin!(sleep);
        match cancel {
            Some(token) => tokio::select! {
                _ = &mut sleep => true,
                _ = token.cancelled() => false,
            },
            None => {
                sleep.await;
                true
            }
        }
    }
    /// async-std has no cancellable timer here: the sleep always runs to completion and the
    /// token is seen before the next attempt.
    #[cfg(all(feature = "async-std", not(feature = "tokio")))]
    async fn sleep(dur: Duration, _cancel: Option<&CancellationToken>) -> bool {
        async_std::task::sleep(dur).await;
        true
    }
}
