//! Integration tests for the demo scenarios.

use std::time::Duration;

use demo::FailPoint;
use demo::scenario::{self, Services};
use resilience::CircuitBreakerConfig;
use saga::{FulfillmentBreakers, SagaOrchestrator, SagaStatus};

fn breakers() -> FulfillmentBreakers {
    FulfillmentBreakers::new(CircuitBreakerConfig::new(3, Duration::from_secs(30))).unwrap()
}

#[tokio::test]
async fn test_fulfillment_without_failure_completes() {
    let services = Services::new();
    let result =
        scenario::run_fulfillment(&SagaOrchestrator::new(), &services, &breakers()).await;

    assert_eq!(result.status, SagaStatus::Completed);
    assert_eq!(services.orders.order_count(), 1);
    assert_eq!(services.inventory.reservation_count(), 1);
    assert_eq!(services.payment.payment_count(), 1);
}

#[tokio::test]
async fn test_each_fail_point_ends_in_expected_status() {
    let cases = [
        (FailPoint::CreateOrder, SagaStatus::CompensatedFailure),
        (FailPoint::ReserveInventory, SagaStatus::CompensatedFailure),
        (FailPoint::ChargePayment, SagaStatus::CompensatedFailure),
        (FailPoint::ReleaseInventory, SagaStatus::PartiallyCompensated),
    ];

    for (fail_point, expected) in cases {
        let services = Services::new();
        services.inject(fail_point);

        let result =
            scenario::run_fulfillment(&SagaOrchestrator::new(), &services, &breakers()).await;

        assert_eq!(result.status, expected, "fail point {fail_point:?}");
        assert_eq!(services.payment.payment_count(), 0);
    }
}

#[tokio::test(start_paused = true)]
async fn test_fanout_reports_slow_shipping_quote() {
    let report = scenario::run_fanout(Duration::from_millis(100)).await.unwrap();

    assert_eq!(report.timed_out, vec!["shipping-quote".to_string()]);
    let successes: Vec<_> = report.successes().map(|(name, _)| name).collect();
    assert_eq!(successes, vec!["stock-levels"]);
    let failures: Vec<_> = report.failures().map(|(name, _)| name).collect();
    assert_eq!(failures, vec!["fraud-score"]);
}

#[test]
fn test_sample_request_total() {
    let request = scenario::sample_request();
    assert_eq!(request.total().map(|t| t.cents()), Some(2 * 1999 + 4500));
}
