use thiserror::Error;

use crate::{Report, Summary};

/// Rejected retry policy parameters.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum PolicyError {
    #[error("max_attempts must be at least 1")]
    ZeroAttempts,
    #[error("backoff multiplier must be a finite number >= 1.0, got {0}")]
    InvalidMultiplier(f64),
}

/// Why a [`Workflow`](crate::Workflow) stopped before its last step.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    /// `summary` holds the steps that ran before `step`.
    #[error("required step `{step}` did not succeed: {report}")]
    RequiredStepFailed {
        step: String,
        report: Report,
        summary: Summary,
    },
    #[error("workflow cancelled during step `{step}`")]
    Cancelled { step: String, summary: Summary },
}
