//! Tests for caller-side retry around polling and exchange operations.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use apsflow::auth::AuthError;
use apsflow::derivative::{JobStatus, PollError};
use apsflow::util::RetryPolicy;
use serde_json::json;

fn policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        initial_backoff: Duration::from_millis(100),
        max_backoff: Duration::from_millis(100),
        multiplier: 2.0,
    }
}

#[tokio::test(start_paused = true)]
async fn retry_policy_retries_transport_errors_until_success() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let attempts_for_task = attempts.clone();

    let task = tokio::spawn(async move {
        policy(4)
            .execute(|| {
                let attempts = attempts_for_task.clone();
                async move {
                    let attempt = attempts.fetch_add(1, Ordering::SeqCst);
                    if attempt < 2 {
                        Err(PollError::Transport("connection reset".to_string()))
                    } else {
                        Ok(JobStatus::in_progress("10% complete"))
                    }
                }
            })
            .await
    });

    tokio::task::yield_now().await;
    tokio::time::advance(Duration::from_secs(1)).await;
    let result = task.await.unwrap().expect("operation ran");

    assert_eq!(result.unwrap(), JobStatus::in_progress("10% complete"));
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn retry_policy_does_not_retry_failed_jobs() {
    let attempts = Arc::new(AtomicUsize::new(0));

    let result = policy(5)
        .execute(|| {
            let attempts = attempts.clone();
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err::<JobStatus, _>(PollError::Failed {
                    job_id: "job-1".to_string(),
                    status: Box::new(JobStatus::failed(json!({ "status": "failed" }))),
                })
            }
        })
        .await
        .expect("operation ran");

    assert!(matches!(result, Err(PollError::Failed { .. })));
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn retry_policy_never_retries_user_cancellation() {
    let attempts = Arc::new(AtomicUsize::new(0));

    let result = policy(3)
        .execute(|| {
            let attempts = attempts.clone();
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(AuthError::Cancelled)
            }
        })
        .await
        .expect("operation ran");

    assert_eq!(result.unwrap_err(), AuthError::Cancelled);
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn retry_policy_returns_last_error_when_attempts_are_exhausted() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let attempts_for_task = attempts.clone();

    let task = tokio::spawn(async move {
        policy(3)
            .execute(|| {
                let attempts = attempts_for_task.clone();
                async move {
                    let attempt = attempts.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(AuthError::Transport(format!("attempt {attempt}")))
                }
            })
            .await
    });

    tokio::task::yield_now().await;
    tokio::time::advance(Duration::from_secs(1)).await;
    let result = task.await.unwrap().expect("operation ran");

    assert_eq!(
        result.unwrap_err(),
        AuthError::Transport("attempt 2".to_string())
    );
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn retry_policy_with_zero_attempts_never_runs() {
    let attempts = AtomicUsize::new(0);

    let result = policy(0)
        .execute(|| {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, PollError>(()) }
        })
        .await;

    assert!(result.is_none());
    assert_eq!(attempts.load(Ordering::SeqCst), 0);
}
