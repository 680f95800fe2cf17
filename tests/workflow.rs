use std::{cell::RefCell, time::Duration};

use reprise::{Captured, Command, Criticality, Outcome, RetryPolicy, Step, Workflow, WorkflowError};

fn policy() -> RetryPolicy {
    RetryPolicy::new(3, Duration::from_secs(2), 2.0).unwrap()
}

#[test]
fn bootstrap_continues_past_best_effort_failures() {
    let waits = RefCell::new(Vec::new());
    let profile = RefCell::new(Vec::<String>::new());
    let mut insights_calls = 0;

    let summary = Workflow::new(policy())
        .sleeper(|d: Duration| waits.borrow_mut().push(d))
        .step(Step::required("read stack outputs", || {
            profile.borrow_mut().push("export DB_HOST=db.internal".into());
            true
        }))
        .step(Step::best_effort("enable performance insights", || {
            insights_calls += 1;
            Err::<(), _>("InvalidDBInstanceState")
        }))
        .step(Step::best_effort("write aliases", || {
            profile.borrow_mut().push("alias psql-main='psql'".into());
            true
        }))
        .run()
        .unwrap();

    assert_eq!(insights_calls, 3);
    assert_eq!(profile.borrow().len(), 2);
    assert_eq!(
        *waits.borrow(),
        [Duration::from_secs(2), Duration::from_secs(4)]
    );

    let degraded: Vec<_> = summary.degraded().collect();
    assert_eq!(degraded.len(), 1);
    assert_eq!(degraded[0].name, "enable performance insights");
    assert_eq!(degraded[0].criticality, Criticality::BestEffort);
    assert_eq!(degraded[0].report.outcome, Outcome::Exhausted);
}

#[test]
fn missing_credentials_are_fatal() {
    let err = Workflow::new(policy())
        .sleeper(|_: Duration| {})
        .step(Step::required("fetch main database secret", || false))
        .run()
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "required step `fetch main database secret` did not succeed: \
         exhausted after 3 attempts (6s waiting)"
    );
    assert!(matches!(err, WorkflowError::RequiredStepFailed { .. }));
}

#[cfg(unix)]
#[test]
fn command_output_feeds_later_steps() {
    let secret = Captured::new();
    let mut fetch = Command::new("printf")
        .arg("%s")
        .arg("{\"password\":\"s3cr3t\"}")
        .capture(&secret);
    let seen = RefCell::new(None);

    Workflow::new(policy())
        .sleeper(|_: Duration| {})
        .step(Step::required("fetch secret", || fetch.attempt()))
        .step(Step::required("write profile", || {
            *seen.borrow_mut() = secret.get();
            seen.borrow().is_some()
        }))
        .run()
        .unwrap();

    assert_eq!(seen.into_inner().as_deref(), Some("{\"password\":\"s3cr3t\"}"));
}
