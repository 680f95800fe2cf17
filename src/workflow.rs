//! Sequential setup steps, each run through the retry driver.
//!
//! Whether a step that never succeeds stops the whole workflow is declared on the step
//! itself with [`Criticality`], not inferred from where the caller happens to bail out.
//!
//! ```
//! use std::time::Duration;
//! use reprise::{RetryPolicy, Step, Workflow};
//!
//! let policy = RetryPolicy::new(3, Duration::ZERO, 1.0).unwrap();
//! let summary = Workflow::new(policy)
//!     .step(Step::required("fetch database secret", || Ok::<_, ()>("s3cr3t")))
//!     .step(Step::best_effort("enable performance insights", || false))
//!     .run()
//!     .unwrap();
//!
//! assert_eq!(summary.degraded().count(), 1);
//! ```

use std::{fmt, time::Duration};

use crate::{
    error::WorkflowError, Attempt, CancellationToken, IntoAttempt, Outcome, Report, RetryPolicy,
    Sleep, ThreadSleep,
};

/// What a step failing means for the rest of the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Criticality {
    /// The workflow stops with [`WorkflowError::RequiredStepFailed`].
    Required,
    /// Logged as a warning; the workflow continues.
    BestEffort,
}

impl fmt::Display for Criticality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Criticality::Required => f.write_str("required"),
            Criticality::BestEffort => f.write_str("best-effort"),
        }
    }
}

/// A named external collaborator exposing one retryable operation.
pub struct Step<'a> {
    name: String,
    criticality: Criticality,
    policy: Option<RetryPolicy>,
    op: Box<dyn FnMut() -> Attempt + 'a>,
}

impl<'a> Step<'a> {
    pub fn new<F, R>(name: impl Into<String>, criticality: Criticality, mut op: F) -> Self
    where
        F: FnMut() -> R + 'a,
        R: IntoAttempt,
    {
        Self {
            name: name.into(),
            criticality,
            policy: None,
            op: Box::new(move || op().into_attempt()),
        }
    }
    pub fn required<F, R>(name: impl Into<String>, op: F) -> Self
    where
        F: FnMut() -> R + 'a,
        R: IntoAttempt,
    {
        Self::new(name, Criticality::Required, op)
    }
    pub fn best_effort<F, R>(name: impl Into<String>, op: F) -> Self
    where
        F: FnMut() -> R + 'a,
        R: IntoAttempt,
    {
        Self::new(name, Criticality::BestEffort, op)
    }
    /// Use `policy` for this step instead of the workflow default.
    pub fn policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = Some(policy);
        self
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn criticality(&self) -> Criticality {
        self.criticality
    }
}

impl fmt::Debug for Step<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("name", &self.name)
            .field("criticality", &self.criticality)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
    pub name: String,
    pub criticality: Criticality,
    pub report: Report,
}

/// Per-step reports of a workflow that ran to the end.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub steps: Vec<StepRecord>,
}

impl Summary {
    /// Best-effort steps that did not succeed.
    pub fn degraded(&self) -> impl Iterator<Item = &StepRecord> {
        self.steps.iter().filter(|step| !step.report.succeeded())
    }
    pub fn is_complete(&self) -> bool {
        self.degraded().next().is_none()
    }
}

/// Lends the workflow's sleeper to one step's driver.
struct Lend<'s, S>(&'s mut S);

impl<S: Sleep> Sleep for Lend<'_, S> {
    fn sleep(&mut self, dur: Duration) {
        self.0.sleep(dur)
    }
}

pub struct Workflow<'a, Sl = ThreadSleep> {
    policy: RetryPolicy,
    steps: Vec<Step<'a>>,
    sleeper: Sl,
    cancel: Option<CancellationToken>,
}

impl<'a> Workflow<'a> {
    /// An empty workflow whose steps use `policy` unless they carry their own.
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            steps: Vec::new(),
            sleeper: ThreadSleep,
            cancel: None,
        }
    }
}

impl<'a, Sl> Workflow<'a, Sl>
where
    Sl: Sleep,
{
    pub fn step(mut self, step: Step<'a>) -> Self {
        self.steps.push(step);
        self
    }
    pub fn sleeper<S: Sleep>(self, sleeper: S) -> Workflow<'a, S> {
        Workflow {
            policy: self.policy,
            steps: self.steps,
            sleeper,
            cancel: self.cancel,
        }
    }
    /// Stop at the current step once `token` is cancelled.
    pub fn cancel_on(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
    /// Runs every step in order.
    ///
    /// Returns early when a required step does not succeed or the workflow is cancelled.
    pub fn run(self) -> Result<Summary, WorkflowError> {
        let Workflow {
            policy,
            steps,
            mut sleeper,
            cancel,
        } = self;
        let mut summary = Summary::default();

        for mut step in steps {
            tracing::info!(step = %step.name, criticality = %step.criticality, "running step");

            let mut retry =
                crate::with_policy(step.policy.unwrap_or(policy)).sleeper(Lend(&mut sleeper));
            if let Some(token) = &cancel {
                retry = retry.cancel_on(token.clone());
            }
            let report = retry.run(|| (step.op)());

            match (report.outcome, step.criticality) {
                (Outcome::Success, _) => {
                    tracing::debug!(step = %step.name, attempts = report.attempts, "step succeeded");
                }
                (Outcome::Cancelled, _) => {
                    tracing::warn!(step = %step.name, "workflow cancelled");
                    return Err(WorkflowError::Cancelled {
                        step: step.name,
                        summary,
                    });
                }
                (_, Criticality::Required) => {
                    tracing::error!(step = %step.name, %report, "required step failed");
                    return Err(WorkflowError::RequiredStepFailed {
                        step: step.name,
                        report,
                        summary,
                    });
                }
                (_, Criticality::BestEffort) => {
                    tracing::warn!(step = %step.name, %report, "continuing without step");
                }
            }

            summary.steps.push(StepRecord {
                name: step.name,
                criticality: step.criticality,
                report,
            });
        }
        Ok(summary)
    }
}
