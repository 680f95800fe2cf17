use std::{
    sync::atomic::{AtomicU32, Ordering},
    time::Duration,
};

use reprise::{Outcome, RetryPolicy};

/// Records every delay the driver asks for instead of sleeping.
fn record(waits: &mut Vec<Duration>) -> impl FnMut(Duration) + '_ {
    move |dur| waits.push(dur)
}

fn policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::new(max_attempts, Duration::from_secs(2), 2.0).unwrap()
}

#[test]
fn always_succeeding_runs_once_for_any_budget() {
    for max_attempts in [1, 2, 5, 10, 100] {
        let mut waits = Vec::new();
        let mut calls = 0;
        let report = reprise::with_policy(policy(max_attempts))
            .sleeper(record(&mut waits))
            .run(|| {
                calls += 1;
                true
            });
        assert_eq!(report.outcome, Outcome::Success);
        assert_eq!(calls, 1, "max_attempts = {max_attempts}");
        assert!(waits.is_empty());
    }
}

#[test]
fn always_failing_runs_exactly_budget() {
    for max_attempts in 1..=8 {
        let mut waits = Vec::new();
        let mut calls = 0;
        let report = reprise::with_policy(policy(max_attempts))
            .sleeper(record(&mut waits))
            .run(|| {
                calls += 1;
                false
            });
        assert_eq!(report.outcome, Outcome::Exhausted);
        assert_eq!(calls, max_attempts);
        assert_eq!(report.attempts, max_attempts);
        assert_eq!(waits.len() as u32, max_attempts - 1);
    }
}

#[test]
fn success_on_kth_attempt_sleeps_geometric_sum() {
    let max_attempts = 6;
    for k in 1..=max_attempts {
        let mut waits = Vec::new();
        let mut calls = 0;
        let report = reprise::with_policy(policy(max_attempts))
            .sleeper(record(&mut waits))
            .run(|| {
                calls += 1;
                calls == k
            });
        assert!(report.succeeded());
        assert_eq!(calls, k);

        // 2s * (2^0 + ... + 2^(k-2)) = 2s * (2^(k-1) - 1)
        let expected = Duration::from_secs(2) * (2u32.pow(k - 1) - 1);
        assert_eq!(waits.iter().sum::<Duration>(), expected, "k = {k}");
        assert_eq!(report.slept, expected);
        assert_eq!(policy(max_attempts).total_delay_before(k), expected);
    }
}

#[test]
fn delays_grow_multiplicatively() {
    let mut waits = Vec::new();
    reprise::with_policy(policy(10))
        .sleeper(record(&mut waits))
        .run(|| false);
    assert_eq!(waits.len(), 9);
    for pair in waits.windows(2) {
        assert_eq!(pair[1], pair[0] * 2);
    }
}

#[test]
fn fail_fail_succeed_scenario() {
    let mut waits = Vec::new();
    let mut outcomes = [false, false, true].into_iter();
    let report = reprise::with_policy(policy(3))
        .sleeper(record(&mut waits))
        .run(|| outcomes.next().unwrap_or(false));
    assert_eq!(report.outcome, Outcome::Success);
    assert_eq!(report.attempts, 3);
    assert_eq!(
        waits,
        [Duration::from_secs(2), Duration::from_secs(4)]
    );
}

#[test]
fn always_fail_scenario_has_no_trailing_delay() {
    let mut waits = Vec::new();
    let report = reprise::with_policy(policy(3))
        .sleeper(record(&mut waits))
        .run(|| Err::<(), _>(std::io::Error::other("throttled")));
    assert_eq!(report.outcome, Outcome::Exhausted);
    assert_eq!(report.attempts, 3);
    assert_eq!(
        waits,
        [Duration::from_secs(2), Duration::from_secs(4)]
    );
}

#[test]
fn result_payload_is_captured_by_the_caller() {
    let mut endpoint = None;
    let mut calls = 0;
    let report = reprise::with_policy(policy(3))
        .sleeper(|_: Duration| {})
        .run(|| {
            calls += 1;
            if calls < 2 {
                return false;
            }
            endpoint = Some("db.workshop.internal:5432".to_string());
            true
        });
    assert!(report.succeeded());
    assert_eq!(endpoint.as_deref(), Some("db.workshop.internal:5432"));
}

#[cfg(feature = "tokio")]
#[tokio::test(start_paused = true)]
async fn concurrent_invocations_do_not_share_state() {
    let shared_policy = policy(4);
    let fast_calls = AtomicU32::new(0);
    let slow_calls = AtomicU32::new(0);

    let (fast, slow) = tokio::join!(
        reprise::with_policy(shared_policy)
            .run_async(async || fast_calls.fetch_add(1, Ordering::SeqCst) == 1),
        reprise::with_policy(shared_policy).run_async(async || {
            slow_calls.fetch_add(1, Ordering::SeqCst);
            false
        }),
    );

    assert_eq!(fast.outcome, Outcome::Success);
    assert_eq!(fast.attempts, 2);
    assert_eq!(fast.slept, Duration::from_secs(2));
    assert_eq!(fast_calls.load(Ordering::SeqCst), 2);

    assert_eq!(slow.outcome, Outcome::Exhausted);
    assert_eq!(slow.attempts, 4);
    assert_eq!(slow.slept, Duration::from_secs(14));
    assert_eq!(slow_calls.load(Ordering::SeqCst), 4);
}
