use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use playlist_weaver::error::{EngineError, RetryPolicy};

fn gateway_error() -> EngineError {
    EngineError::Provider {
        status: 502,
        message: "bad gateway".to_string(),
    }
}

#[tokio::test]
async fn test_transient_failures_retry_until_success() {
    let calls = AtomicU32::new(0);
    let policy = RetryPolicy::new(3, Duration::ZERO);

    let result = policy
        .run(|| async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(gateway_error())
            } else {
                Ok("done")
            }
        })
        .await;

    assert_eq!(result.unwrap(), "done");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_attempts_are_exhausted_on_persistent_transient_failure() {
    let calls = AtomicU32::new(0);
    let policy = RetryPolicy::new(3, Duration::ZERO);

    let result: Result<(), _> = policy
        .run(|| async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(gateway_error())
        })
        .await;

    assert!(matches!(
        result,
        Err(EngineError::Provider { status: 502, .. })
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_permanent_failures_surface_without_retry() {
    let calls = AtomicU32::new(0);
    let policy = RetryPolicy::new(3, Duration::ZERO);

    let result: Result<(), _> = policy
        .run(|| async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(EngineError::Auth("token rejected".to_string()))
        })
        .await;

    assert!(matches!(result, Err(EngineError::Auth(_))));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // Data-shape failures are equally final
    calls.store(0, Ordering::SeqCst);
    let result: Result<(), _> = policy
        .run(|| async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(EngineError::Data("unexpected shape".to_string()))
        })
        .await;

    assert!(matches!(result, Err(EngineError::Data(_))));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_fixed_backoff_between_attempts() {
    let calls = AtomicU32::new(0);
    let policy = RetryPolicy::new(3, Duration::from_secs(1));

    let started = tokio::time::Instant::now();
    let result = policy
        .run(|| async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(gateway_error())
            } else {
                Ok(())
            }
        })
        .await;

    assert!(result.is_ok());
    // Two failed attempts, one second of backoff after each
    assert_eq!(started.elapsed(), Duration::from_secs(2));
}

#[test]
fn test_error_transience_classification() {
    assert!(EngineError::Provider {
        status: 429,
        message: String::new()
    }
    .is_transient());
    assert!(gateway_error().is_transient());
    assert!(!EngineError::Provider {
        status: 404,
        message: String::new()
    }
    .is_transient());
    assert!(!EngineError::Auth(String::new()).is_transient());
    assert!(!EngineError::Data(String::new()).is_transient());
    assert!(!EngineError::NothingSelected.is_transient());
}
