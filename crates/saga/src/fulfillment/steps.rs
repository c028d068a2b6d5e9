//! Saga steps of the order fulfillment saga.

use std::sync::Arc;

use async_trait::async_trait;
use common::Money;
use resilience::RemoteError;
use serde_json::json;

use super::FulfillmentRequest;
use super::inventory::InventoryService;
use super::orders::OrderService;
use super::payment::PaymentService;
use crate::error::StepError;
use crate::step::{SagaStep, StepOutput};

/// Step name: place the order.
pub const STEP_CREATE_ORDER: &str = "create_order";

/// Step name: reserve stock for the order lines.
pub const STEP_RESERVE_INVENTORY: &str = "reserve_inventory";

/// Step name: charge the customer.
pub const STEP_CHARGE_PAYMENT: &str = "charge_payment";

/// Reads a string field the forward action put into its output.
fn output_field<'a>(output: &'a StepOutput, key: &str) -> Result<&'a str, StepError> {
    output
        .as_ref()
        .and_then(|value| value.get(key))
        .and_then(|value| value.as_str())
        .ok_or_else(|| StepError::other(format!("forward output has no '{key}'")))
}

/// The request total, rejected as a business error if it overflows.
fn request_total(request: &FulfillmentRequest, dependency: &str) -> Result<Money, StepError> {
    request.total().ok_or_else(|| {
        StepError::from(RemoteError::rejected(
            dependency,
            format!("total of order {} overflows", request.order_id),
        ))
    })
}

/// Places the order; undone by cancelling it.
pub struct CreateOrderStep<O> {
    request: Arc<FulfillmentRequest>,
    orders: O,
}

impl<O> CreateOrderStep<O> {
    pub fn new(request: Arc<FulfillmentRequest>, orders: O) -> Self {
        Self { request, orders }
    }
}

#[async_trait]
impl<O: OrderService> SagaStep for CreateOrderStep<O> {
    fn name(&self) -> &str {
        STEP_CREATE_ORDER
    }

    async fn forward(&self) -> Result<StepOutput, StepError> {
        let request = &self.request;
        let total = request_total(request, "orders")?;
        self.orders
            .create(request.order_id, request.customer_id, total)
            .await?;
        Ok(Some(json!({ "order_id": request.order_id })))
    }

    async fn compensate(&self, _output: &StepOutput) -> Result<(), StepError> {
        self.orders.cancel(self.request.order_id).await?;
        Ok(())
    }

    fn compensation_description(&self) -> String {
        format!("cancel order {}", self.request.order_id)
    }
}

/// Reserves stock; undone by releasing the reservation.
pub struct ReserveInventoryStep<I> {
    request: Arc<FulfillmentRequest>,
    inventory: I,
}

impl<I> ReserveInventoryStep<I> {
    pub fn new(request: Arc<FulfillmentRequest>, inventory: I) -> Self {
        Self { request, inventory }
    }
}

#[async_trait]
impl<I: InventoryService> SagaStep for ReserveInventoryStep<I> {
    fn name(&self) -> &str {
        STEP_RESERVE_INVENTORY
    }

    async fn forward(&self) -> Result<StepOutput, StepError> {
        let reservation = self
            .inventory
            .reserve(self.request.order_id, &self.request.lines)
            .await?;
        Ok(Some(json!({ "reservation_id": reservation.reservation_id })))
    }

    async fn compensate(&self, output: &StepOutput) -> Result<(), StepError> {
        let reservation_id = output_field(output, "reservation_id")?;
        self.inventory.release(reservation_id).await?;
        Ok(())
    }

    fn compensation_description(&self) -> String {
        "release inventory reservation".to_string()
    }
}

/// Charges the customer; undone by a refund.
pub struct ChargePaymentStep<P> {
    request: Arc<FulfillmentRequest>,
    payment: P,
}

impl<P> ChargePaymentStep<P> {
    pub fn new(request: Arc<FulfillmentRequest>, payment: P) -> Self {
        Self { request, payment }
    }
}

#[async_trait]
impl<P: PaymentService> SagaStep for ChargePaymentStep<P> {
    fn name(&self) -> &str {
        STEP_CHARGE_PAYMENT
    }

    async fn forward(&self) -> Result<StepOutput, StepError> {
        let request = &self.request;
        let total = request_total(request, "payments")?;
        let payment = self
            .payment
            .charge(request.order_id, request.customer_id, total)
            .await?;
        Ok(Some(json!({ "payment_id": payment.payment_id })))
    }

    async fn compensate(&self, output: &StepOutput) -> Result<(), StepError> {
        let payment_id = output_field(output, "payment_id")?;
        self.payment.refund(payment_id).await?;
        Ok(())
    }

    fn compensation_description(&self) -> String {
        "refund payment".to_string()
    }
}

#[cfg(test)]
mod tests {
    use common::{CustomerId, ProductId};

    use super::*;
    use crate::fulfillment::{
        InMemoryInventoryService, InMemoryOrderService, InMemoryPaymentService, OrderLine,
    };

    fn request() -> Arc<FulfillmentRequest> {
        Arc::new(FulfillmentRequest::new(
            CustomerId::new(),
            vec![OrderLine::new(ProductId::new("SKU-001"), 3, Money::from_cents(500))],
        ))
    }

    #[tokio::test]
    async fn test_reserve_output_drives_release() {
        let inventory = InMemoryInventoryService::new();
        let step = ReserveInventoryStep::new(request(), inventory.clone());

        let output = step.forward().await.unwrap();
        assert_eq!(output, Some(json!({ "reservation_id": "RES-0001" })));
        assert!(inventory.has_reservation("RES-0001"));

        step.compensate(&output).await.unwrap();
        assert_eq!(inventory.reservation_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_output_field_is_an_error() {
        let step = ChargePaymentStep::new(request(), InMemoryPaymentService::new());
        let err = step.compensate(&None).await.unwrap_err();
        assert_eq!(err, StepError::other("forward output has no 'payment_id'"));
    }

    #[tokio::test]
    async fn test_charge_uses_request_total() {
        let payment = InMemoryPaymentService::new();
        let step = ChargePaymentStep::new(request(), payment.clone());

        let output = step.forward().await.unwrap();
        assert_eq!(output_field(&output, "payment_id").unwrap(), "PAY-0001");
        assert_eq!(payment.payment_count(), 1);
        assert_eq!(step.compensation_description(), "refund payment");
    }

    #[tokio::test]
    async fn test_overflowing_total_is_rejected_without_placing_order() {
        let request = Arc::new(FulfillmentRequest::new(
            CustomerId::new(),
            vec![OrderLine::new(ProductId::new("SKU-001"), 2, Money::from_cents(i64::MAX))],
        ));
        let orders = InMemoryOrderService::new();
        let step = CreateOrderStep::new(request, orders.clone());

        let err = step.forward().await.unwrap_err();
        assert!(matches!(err, StepError::Remote(RemoteError::Rejected { .. })));
        assert_eq!(orders.order_count(), 0);
    }
}
