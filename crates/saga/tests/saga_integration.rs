//! Integration tests for the order fulfillment saga.

use std::time::Duration;

use common::{CustomerId, Money, ProductId};
use resilience::{CircuitBreakerConfig, CircuitState, RemoteError};
use saga::fulfillment::{
    OrderStatus, STEP_CHARGE_PAYMENT, STEP_CREATE_ORDER, STEP_RESERVE_INVENTORY,
};
use saga::{
    FulfillmentBreakers, FulfillmentRequest, InMemoryInventoryService, InMemoryOrderService,
    InMemoryPaymentService, OrderLine, SagaError, SagaOrchestrator, SagaResult, SagaStatus,
    StepError, order_fulfillment_steps,
};

struct TestHarness {
    orchestrator: SagaOrchestrator,
    orders: InMemoryOrderService,
    inventory: InMemoryInventoryService,
    payment: InMemoryPaymentService,
}

impl TestHarness {
    fn new() -> Self {
        Self {
            orchestrator: SagaOrchestrator::new(),
            orders: InMemoryOrderService::new(),
            inventory: InMemoryInventoryService::new(),
            payment: InMemoryPaymentService::new(),
        }
    }

    fn request(&self) -> FulfillmentRequest {
        FulfillmentRequest::new(
            CustomerId::new(),
            vec![
                OrderLine::new(ProductId::new("SKU-001"), 2, Money::from_cents(1000)),
                OrderLine::new(ProductId::new("SKU-002"), 1, Money::from_cents(500)),
            ],
        )
    }

    async fn run(
        &self,
        request: FulfillmentRequest,
        breakers: Option<&FulfillmentBreakers>,
    ) -> SagaResult {
        let steps = order_fulfillment_steps(
            request,
            self.orders.clone(),
            self.inventory.clone(),
            self.payment.clone(),
            breakers,
        );
        self.orchestrator.execute(&steps).await
    }
}

#[tokio::test]
async fn test_successful_fulfillment() {
    let h = TestHarness::new();
    let request = h.request();
    let order_id = request.order_id;

    let result = h.run(request, None).await;

    assert_eq!(result.status, SagaStatus::Completed);
    assert_eq!(result.last_completed, Some(2));
    assert!(result.compensated_steps().is_empty());
    assert_eq!(h.orders.order_status(order_id), Some(OrderStatus::Placed));
    assert_eq!(h.inventory.reservation_count(), 1);
    assert_eq!(h.payment.payment_count(), 1);

    let outputs = result.into_result().unwrap();
    assert_eq!(outputs[1].as_ref().unwrap()["reservation_id"], "RES-0001");
    assert_eq!(outputs[2].as_ref().unwrap()["payment_id"], "PAY-0001");
}

#[tokio::test]
async fn test_payment_failure_compensates_inventory_then_order() {
    let h = TestHarness::new();
    h.payment.set_fail_on_charge(true);
    let request = h.request();
    let order_id = request.order_id;

    let result = h.run(request, None).await;

    assert_eq!(result.status, SagaStatus::CompensatedFailure);
    assert_eq!(result.last_completed, Some(1));
    assert_eq!(
        result.compensated_steps(),
        vec![STEP_RESERVE_INVENTORY, STEP_CREATE_ORDER]
    );

    let cause = result.cause.clone().unwrap();
    assert_eq!(cause.step, STEP_CHARGE_PAYMENT);
    assert_eq!(
        cause.source,
        StepError::Remote(RemoteError::transient("payments", "payment gateway unavailable"))
    );

    assert_eq!(h.inventory.reservation_count(), 0);
    assert_eq!(h.inventory.released_count(), 1);
    assert_eq!(h.orders.order_status(order_id), Some(OrderStatus::Cancelled));
    assert_eq!(h.payment.payment_count(), 0);

    match result.into_result() {
        Err(SagaError::StepFailed { step, .. }) => assert_eq!(step, STEP_CHARGE_PAYMENT),
        other => panic!("expected StepFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_inventory_failure_cancels_order_only() {
    let h = TestHarness::new();
    h.inventory.set_fail_on_reserve(true);
    let request = h.request();
    let order_id = request.order_id;

    let result = h.run(request, None).await;

    assert_eq!(result.status, SagaStatus::CompensatedFailure);
    assert_eq!(result.compensated_steps(), vec![STEP_CREATE_ORDER]);
    assert_eq!(h.orders.order_status(order_id), Some(OrderStatus::Cancelled));
    assert_eq!(h.payment.payment_count(), 0);
}

#[tokio::test]
async fn test_failed_release_leaves_saga_partially_compensated() {
    let h = TestHarness::new();
    h.payment.set_fail_on_charge(true);
    h.inventory.set_fail_on_release(true);
    let request = h.request();
    let order_id = request.order_id;

    let result = h.run(request, None).await;

    assert_eq!(result.status, SagaStatus::PartiallyCompensated);
    assert!(result.status.requires_attention());
    assert_eq!(result.compensation_errors.len(), 1);
    assert_eq!(result.compensation_errors[0].step, STEP_RESERVE_INVENTORY);
    assert_eq!(
        result.compensation_errors[0].description,
        "release inventory reservation"
    );

    // The order was still cancelled after the release failed.
    assert_eq!(result.compensated_steps(), vec![STEP_CREATE_ORDER]);
    assert_eq!(h.orders.order_status(order_id), Some(OrderStatus::Cancelled));
    assert_eq!(h.inventory.reservation_count(), 1);

    assert!(matches!(
        result.into_result(),
        Err(SagaError::CompensationFailed { .. })
    ));
}

#[tokio::test]
async fn test_repeated_sagas_are_independent() {
    let h = TestHarness::new();

    let first = h.run(h.request(), None).await;
    let second = h.run(h.request(), None).await;

    assert!(first.is_completed());
    assert!(second.is_completed());
    assert_ne!(first.saga_id, second.saga_id);
    assert_eq!(h.orders.order_count(), 2);
    assert_eq!(h.inventory.reservation_count(), 2);
    assert_eq!(h.payment.payment_count(), 2);
}

#[tokio::test]
async fn test_open_payment_breaker_fast_fails_and_still_compensates() {
    let h = TestHarness::new();
    let breakers =
        FulfillmentBreakers::new(CircuitBreakerConfig::new(2, Duration::from_secs(60))).unwrap();
    h.payment.set_fail_on_charge(true);

    for _ in 0..2 {
        let result = h.run(h.request(), Some(&breakers)).await;
        assert_eq!(result.status, SagaStatus::CompensatedFailure);
    }
    assert_eq!(breakers.payments.state(), CircuitState::Open);

    // The gateway recovered, but the breaker has not noticed yet.
    h.payment.set_fail_on_charge(false);
    let result = h.run(h.request(), Some(&breakers)).await;

    assert_eq!(result.status, SagaStatus::CompensatedFailure);
    assert!(matches!(
        result.cause.as_ref().map(|c| &c.source),
        Some(StepError::CircuitOpen(open)) if open.breaker == "payments"
    ));
    assert_eq!(
        result.compensated_steps(),
        vec![STEP_RESERVE_INVENTORY, STEP_CREATE_ORDER]
    );
    assert_eq!(h.payment.payment_count(), 0);
    assert_eq!(h.inventory.reservation_count(), 0);
    assert_eq!(breakers.orders.state(), CircuitState::Closed);
    assert_eq!(breakers.inventory.state(), CircuitState::Closed);
}

#[tokio::test]
async fn test_rejected_order_does_not_trip_breaker() {
    let h = TestHarness::new();
    let breakers =
        FulfillmentBreakers::new(CircuitBreakerConfig::new(1, Duration::from_secs(60))).unwrap();

    for _ in 0..3 {
        let empty = FulfillmentRequest::new(CustomerId::new(), vec![]);
        let result = h.run(empty, Some(&breakers)).await;
        assert_eq!(result.status, SagaStatus::CompensatedFailure);
        assert_eq!(result.last_completed, None);
    }

    assert_eq!(breakers.orders.state(), CircuitState::Closed);
}

#[tokio::test]
async fn test_journal_serializes_to_json() {
    let h = TestHarness::new();
    h.payment.set_fail_on_charge(true);

    let result = h.run(h.request(), None).await;
    let json = serde_json::to_value(&result.journal).unwrap();
    let types: Vec<_> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|event| event["type"].as_str().unwrap().to_string())
        .collect();

    assert_eq!(types.first().map(String::as_str), Some("SagaStarted"));
    assert_eq!(types.last().map(String::as_str), Some("SagaFailed"));
    assert_eq!(
        types.iter().filter(|t| *t == "CompensationStepCompleted").count(),
        2
    );
}
