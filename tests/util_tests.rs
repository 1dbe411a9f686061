//! Tests for utility modules (retry, timeout) and error classification.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mathchat::error::{ErrorCategory, MathChatError, RecoverySuggestion};
use mathchat::util::{with_timeout, RetryPolicy};

fn policy(max_attempts: u32, backoff_ms: u64) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        initial_backoff: Duration::from_millis(backoff_ms),
        max_backoff: Duration::from_millis(backoff_ms),
        multiplier: 2.0,
    }
}

#[tokio::test(start_paused = true)]
async fn retry_policy_retries_retryable_errors_until_success() {
    let policy = policy(4, 100);
    let attempts = Arc::new(AtomicUsize::new(0));
    let attempts_for_task = attempts.clone();

    let task = tokio::spawn(async move {
        policy
            .execute(|| {
                let attempts = attempts_for_task.clone();
                async move {
                    let attempt = attempts.fetch_add(1, Ordering::SeqCst);
                    if attempt < 2 {
                        Err(MathChatError::transport("connection reset"))
                    } else {
                        Ok::<_, MathChatError>("ok")
                    }
                }
            })
            .await
    });

    tokio::task::yield_now().await;
    tokio::time::advance(Duration::from_secs(1)).await;
    let result = task.await.unwrap();

    assert_eq!(result.unwrap(), "ok");
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn retry_policy_stops_immediately_for_non_retryable_errors() {
    let policy = policy(5, 1);
    let attempts = Arc::new(AtomicUsize::new(0));

    let result = policy
        .execute(|| {
            let attempts = attempts.clone();
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(MathChatError::Authentication("bad-key".to_string()))
            }
        })
        .await;

    match result {
        Err(MathChatError::Authentication(message)) => assert_eq!(message, "bad-key"),
        other => panic!("expected authentication error, got {other:?}"),
    }
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn retry_policy_returns_last_error_when_attempts_are_exhausted() {
    let policy = policy(3, 50);
    let attempts = Arc::new(AtomicUsize::new(0));
    let attempts_for_task = attempts.clone();

    let task = tokio::spawn(async move {
        policy
            .execute(|| {
                let attempts = attempts_for_task.clone();
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(MathChatError::api(503, "overloaded"))
                }
            })
            .await
    });

    tokio::task::yield_now().await;
    tokio::time::advance(Duration::from_secs(1)).await;
    let result = task.await.unwrap();

    match result {
        Err(MathChatError::Api { status, .. }) => assert_eq!(status, 503),
        other => panic!("expected api error, got {other:?}"),
    }
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn retry_policy_waits_at_least_retry_after() {
    let policy = policy(2, 10);
    let attempts = AtomicUsize::new(0);
    let start = tokio::time::Instant::now();

    let result = policy
        .execute(|| {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt == 0 {
                    Err(MathChatError::RateLimited {
                        retry_after_ms: Some(2_000),
                    })
                } else {
                    Ok::<_, MathChatError>(attempt)
                }
            }
        })
        .await;

    assert_eq!(result.unwrap(), 1);
    assert!(start.elapsed() >= Duration::from_millis(2_000));
}

#[tokio::test]
async fn retry_policy_with_zero_attempts_still_runs_once() {
    let attempts = Arc::new(AtomicUsize::new(0));

    let result = policy(0, 1)
        .execute(|| {
            let attempts = attempts.clone();
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Ok::<_, MathChatError>(())
            }
        })
        .await;

    assert!(result.is_ok());
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
}

#[test]
fn backoff_grows_geometrically_up_to_the_cap() {
    let policy = RetryPolicy {
        max_attempts: 10,
        initial_backoff: Duration::from_millis(100),
        max_backoff: Duration::from_millis(500),
        multiplier: 2.0,
    };
    let delays: Vec<u128> = (0..5).map(|n| policy.backoff_for(n).as_millis()).collect();
    assert_eq!(delays, vec![100, 200, 400, 500, 500]);
}

#[tokio::test]
async fn with_timeout_passes_through_fast_results() {
    let value = with_timeout(Duration::from_secs(5), async { Ok::<_, MathChatError>(7) })
        .await
        .unwrap();
    assert_eq!(value, 7);
}

#[test]
fn error_helper_mappings_are_stable_for_major_variants() {
    let cases = vec![
        (
            MathChatError::Authentication("bad-key".into()),
            ErrorCategory::Authentication,
            false,
            RecoverySuggestion::CheckCredentials,
        ),
        (
            MathChatError::RateLimited {
                retry_after_ms: Some(1000),
            },
            ErrorCategory::RateLimit,
            true,
            RecoverySuggestion::RetryWithBackoff,
        ),
        (
            MathChatError::Timeout(30_000),
            ErrorCategory::Timeout,
            true,
            RecoverySuggestion::IncreaseTimeout,
        ),
        (
            MathChatError::transport("server closed the session"),
            ErrorCategory::Transport,
            true,
            RecoverySuggestion::CheckToolServer,
        ),
        (
            MathChatError::Configuration("missing key".into()),
            ErrorCategory::Configuration,
            false,
            RecoverySuggestion::CheckConfiguration,
        ),
        (
            MathChatError::IterationLimitExceeded { limit: 20 },
            ErrorCategory::Protocol,
            false,
            RecoverySuggestion::RephraseQuery,
        ),
        (
            MathChatError::Cancelled,
            ErrorCategory::Cancelled,
            false,
            RecoverySuggestion::None,
        ),
    ];

    for (error, category, retryable, recovery) in cases {
        assert_eq!(error.category(), category, "category for {error}");
        assert_eq!(error.is_retryable(), retryable, "retryable for {error}");
        assert_eq!(error.recovery_suggestion(), recovery, "recovery for {error}");
    }
}
