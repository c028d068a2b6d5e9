//! Integration tests for circuit breaking and fan-out.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use resilience::{
    BreakerError, CircuitBreaker, CircuitBreakerConfig, CircuitState, FanOut, PredicateClassifier,
    RemoteError, TransientOnly,
};

fn payments_breaker() -> CircuitBreaker<TransientOnly> {
    CircuitBreaker::with_classifier(
        "payments",
        CircuitBreakerConfig::new(3, Duration::from_secs(10)),
        TransientOnly,
    )
    .unwrap()
}

async fn charge(
    breaker: &CircuitBreaker<TransientOnly>,
    outcome: Result<&'static str, RemoteError>,
) -> Result<&'static str, BreakerError<RemoteError>> {
    breaker.call(|| async move { outcome }).await
}

#[tokio::test(start_paused = true)]
async fn test_open_then_recover_after_reset_timeout() {
    let breaker = payments_breaker();

    for _ in 0..3 {
        let err = charge(&breaker, Err(RemoteError::transient("payments", "503")))
            .await
            .unwrap_err();
        assert!(!err.is_open());
    }
    assert_eq!(breaker.state(), CircuitState::Open);

    tokio::time::advance(Duration::from_secs(5)).await;
    let err = charge(&breaker, Ok("PAY-1")).await.unwrap_err();
    match err {
        BreakerError::Open(open) => assert_eq!(open.breaker, "payments"),
        other => panic!("expected fast-fail, got {other:?}"),
    }

    tokio::time::advance(Duration::from_secs(6)).await;
    assert_eq!(charge(&breaker, Ok("PAY-2")).await.unwrap(), "PAY-2");
    assert_eq!(breaker.state(), CircuitState::Closed);
    assert_eq!(breaker.failure_count(), 0);

    let stats = breaker.stats();
    assert_eq!(stats.total_calls, 4);
    assert_eq!(stats.total_failures, 3);
    assert_eq!(stats.total_rejected, 1);
}

#[tokio::test(start_paused = true)]
async fn test_timeouts_count_but_rejections_do_not() {
    let breaker = payments_breaker();

    let timeout = || RemoteError::Timeout {
        dependency: "payments".to_string(),
        elapsed: Duration::from_secs(2),
    };

    charge(&breaker, Err(timeout())).await.unwrap_err();
    charge(&breaker, Err(timeout())).await.unwrap_err();
    charge(&breaker, Err(RemoteError::rejected("payments", "card declined")))
        .await
        .unwrap_err();

    // The rejection was a healthy answer and reset the streak.
    assert_eq!(breaker.state(), CircuitState::Closed);
    assert_eq!(breaker.failure_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_predicate_classifier_policy() {
    let breaker = CircuitBreaker::with_classifier(
        "catalog",
        CircuitBreakerConfig::new(2, Duration::from_secs(1)),
        PredicateClassifier::new(|status: &u16| *status >= 500),
    )
    .unwrap();

    for _ in 0..4 {
        let _ = breaker.call(|| async { Err::<(), u16>(404) }).await;
    }
    assert_eq!(breaker.state(), CircuitState::Closed);

    for _ in 0..2 {
        let _ = breaker.call(|| async { Err::<(), u16>(503) }).await;
    }
    assert_eq!(breaker.state(), CircuitState::Open);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_callers_share_one_trial() {
    let breaker = Arc::new(
        CircuitBreaker::new("shared", CircuitBreakerConfig::new(1, Duration::from_millis(50)))
            .unwrap(),
    );
    let _ = breaker
        .call(|| async { Err::<(), _>(RemoteError::transient("shared", "down")) })
        .await;
    assert_eq!(breaker.state(), CircuitState::Open);

    tokio::time::sleep(Duration::from_millis(60)).await;

    let invoked = Arc::new(AtomicU32::new(0));
    let mut handles = Vec::new();
    for _ in 0..20 {
        let breaker = breaker.clone();
        let invoked = invoked.clone();
        handles.push(tokio::spawn(async move {
            breaker
                .call(|| async move {
                    invoked.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    Ok::<_, RemoteError>(())
                })
                .await
        }));
    }

    let mut admitted = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(()) => admitted += 1,
            Err(e) if e.is_open() => rejected += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert_eq!(invoked.load(Ordering::SeqCst), 1);
    assert_eq!(admitted, 1);
    assert_eq!(rejected, 19);
    assert_eq!(breaker.state(), CircuitState::Closed);
}

#[tokio::test(start_paused = true)]
async fn test_fan_out_degrades_gracefully() {
    let healthy = Arc::new(
        CircuitBreaker::new("recommendations", CircuitBreakerConfig::default()).unwrap(),
    );
    let failing =
        Arc::new(CircuitBreaker::new("reviews", CircuitBreakerConfig::default()).unwrap());
    let tripped = Arc::new(
        CircuitBreaker::new("pricing", CircuitBreakerConfig::new(1, Duration::from_secs(30)))
            .unwrap(),
    );
    let slow = Arc::new(
        CircuitBreaker::new("shipping-quotes", CircuitBreakerConfig::default()).unwrap(),
    );

    let _ = tripped
        .call(|| async { Err::<(), _>(RemoteError::transient("pricing", "down")) })
        .await;

    let report = FanOut::new(Duration::from_millis(250))
        .dependency(healthy, || async { Ok::<_, RemoteError>("3 items") })
        .dependency(failing, || async {
            Err(RemoteError::transient("reviews", "connection reset"))
        })
        .dependency(tripped, || async { Ok("$9.99") })
        .dependency(slow, || async {
            tokio::time::sleep(Duration::from_secs(3)).await;
            Ok("2 days")
        })
        .collect()
        .await;

    assert_eq!(report.timed_out, vec!["shipping-quotes".to_string()]);
    assert_eq!(report.responses.len(), 3);

    let successes: Vec<_> = report.successes().collect();
    assert_eq!(successes, vec![("recommendations", &"3 items")]);

    let mut failures: Vec<_> = report
        .failures()
        .map(|(name, err)| (name.to_string(), err.is_open()))
        .collect();
    failures.sort();
    assert_eq!(
        failures,
        vec![("pricing".to_string(), true), ("reviews".to_string(), false)]
    );
}
