use std::{
    sync::atomic::{AtomicU32, Ordering},
    time::Duration,
};

use reprise::{CancellationToken, RetryPolicy};

async fn describe_instance(calls: &AtomicU32) -> std::io::Result<&'static str> {
    let n = calls.fetch_add(1, Ordering::SeqCst);
    println!("describe-db-instances attempt {}", n + 1);
    if n < 2 {
        Err(std::io::Error::other("DBInstanceNotFound"))
    } else {
        Ok("available")
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let policy = RetryPolicy::new(5, Duration::from_millis(250), 2.0).unwrap_or_default();
    let status = AtomicU32::new(0);
    let state = std::sync::Mutex::new(None);

    let report = reprise::with_policy(policy)
        .after_attempt(|verdict, attempt| println!("[after] attempt = {attempt}, {verdict:?}"))
        .run_async(async || {
            let res = describe_instance(&status).await;
            if let Ok(s) = &res {
                *state.lock().unwrap() = Some(*s);
            }
            res
        })
        .await;
    println!("lookup {report}, state = {:?}", state.lock().unwrap());

    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(600)).await;
        canceller.cancel();
    });
    let report = reprise::with_policy(policy)
        .cancel_on(token)
        .equal_jitter()
        .run_async(async || false)
        .await;
    println!("never-ready step {report}");
}
