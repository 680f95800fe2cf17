//! Walks through a workshop bootstrap with stand-in commands.
//!
//! ```sh
//! RUST_LOG=reprise=debug,workshop_setup=info cargo run --example workshop_setup
//! ```

use std::time::Duration;

use reprise::{Captured, Command, RetryConfig, RetryPolicy, Step, Workflow};
use tracing_subscriber::EnvFilter;

const RETRY_SETTINGS: &str = r#"{
    "max_attempts": 4,
    "initial_delay_ms": 200,
    "backoff_multiplier": 2.0,
    "max_delay_ms": 1000
}"#;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let policy = match serde_json::from_str::<RetryConfig>(RETRY_SETTINGS)
        .map_err(|err| err.to_string())
        .and_then(|config| RetryPolicy::try_from(config).map_err(|err| err.to_string()))
    {
        Ok(policy) => policy,
        Err(err) => {
            tracing::error!(%err, "invalid retry settings");
            std::process::exit(2);
        }
    };
    let metadata = RetryPolicy::new(3, Duration::from_millis(50), 2.0).unwrap_or(policy);

    let stack_name = Captured::new();
    let mut describe = Command::new("echo").arg("workshop-stack").capture(&stack_name);
    let mut flaky_calls = 0;

    let result = Workflow::new(policy)
        .step(Step::required("read stack outputs", || describe.attempt()).policy(metadata))
        .step(Step::required("fetch database secret", || {
            stack_name.get().is_some_and(|name| !name.is_empty())
        }))
        .step(Step::best_effort("enable performance insights", || {
            flaky_calls += 1;
            flaky_calls >= 3
        }))
        .step(Step::best_effort(
            "create demo user",
            || Command::new("false").attempt(),
        ))
        .run();

    match result {
        Ok(summary) => {
            for step in summary.degraded() {
                tracing::warn!(step = %step.name, report = %step.report, "setup degraded");
            }
            tracing::info!(steps = summary.steps.len(), "workshop environment ready");
        }
        Err(err) => {
            tracing::error!(%err, "workshop setup aborted");
            std::process::exit(1);
        }
    }
}
