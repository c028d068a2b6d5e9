//! The scenarios the demo binary runs.

use std::sync::Arc;
use std::time::Duration;

use common::{CustomerId, Money, ProductId};
use resilience::{
    CircuitBreaker, CircuitBreakerConfig, ConfigError, FanOut, FanOutReport, RemoteError,
    TransientOnly,
};
use saga::{
    FulfillmentBreakers, FulfillmentRequest, InMemoryInventoryService, InMemoryOrderService,
    InMemoryPaymentService, OrderLine, SagaOrchestrator, SagaResult, order_fulfillment_steps,
};

use crate::config::FailPoint;

/// The in-memory services behind the fulfillment saga.
#[derive(Debug, Clone, Default)]
pub struct Services {
    pub orders: InMemoryOrderService,
    pub inventory: InMemoryInventoryService,
    pub payment: InMemoryPaymentService,
}

impl Services {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms the failure for `fail_point`.
    pub fn inject(&self, fail_point: FailPoint) {
        match fail_point {
            FailPoint::CreateOrder => self.orders.set_fail_on_create(true),
            FailPoint::ReserveInventory => self.inventory.set_fail_on_reserve(true),
            FailPoint::ChargePayment => self.payment.set_fail_on_charge(true),
            FailPoint::ReleaseInventory => {
                self.payment.set_fail_on_charge(true);
                self.inventory.set_fail_on_release(true);
            }
        }
    }
}

/// A two-line sample order.
pub fn sample_request() -> FulfillmentRequest {
    FulfillmentRequest::new(
        CustomerId::new(),
        vec![
            OrderLine::new(ProductId::new("SKU-001"), 2, Money::from_cents(1999)),
            OrderLine::new(ProductId::new("SKU-042"), 1, Money::from_cents(4500)),
        ],
    )
}

/// Runs one fulfillment saga against `services`, protected by `breakers`.
pub async fn run_fulfillment(
    orchestrator: &SagaOrchestrator,
    services: &Services,
    breakers: &FulfillmentBreakers,
) -> SagaResult {
    let request = sample_request();
    let total = request
        .total()
        .map_or_else(|| "overflow".to_string(), |total| total.to_string());
    tracing::info!(
        order_id = %request.order_id,
        %total,
        "starting order fulfillment"
    );

    let steps = order_fulfillment_steps(
        request,
        services.orders.clone(),
        services.inventory.clone(),
        services.payment.clone(),
        Some(breakers),
    );
    orchestrator.execute(&steps).await
}

/// Asks three dependencies for order-page data and keeps whatever arrives
/// within `wait`. The shipping quote is deliberately too slow.
pub async fn run_fanout(wait: Duration) -> Result<FanOutReport<String, RemoteError>, ConfigError> {
    let config = CircuitBreakerConfig::default();
    let stock = dependency("stock-levels", config.clone())?;
    let fraud = dependency("fraud-score", config.clone())?;
    let shipping = dependency("shipping-quote", config)?;

    let report = FanOut::new(wait)
        .dependency(stock, || async { Ok("SKU-001: 14 in stock".to_string()) })
        .dependency(fraud, || async {
            Err(RemoteError::transient("fraud-score", "connection reset"))
        })
        .dependency(shipping, move || async move {
            tokio::time::sleep(wait * 4).await;
            Ok("2-day shipping: $7.50".to_string())
        })
        .collect()
        .await;

    Ok(report)
}

fn dependency(
    name: &str,
    config: CircuitBreakerConfig,
) -> Result<Arc<CircuitBreaker<TransientOnly>>, ConfigError> {
    CircuitBreaker::with_classifier(name, config, TransientOnly).map(Arc::new)
}
