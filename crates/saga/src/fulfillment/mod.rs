//! Order fulfillment saga.
//!
//! Three steps against three independent services:
//! 1. Create the order (undo: cancel it)
//! 2. Reserve inventory (undo: release the reservation)
//! 3. Charge payment (undo: refund)
//!
//! Each forward action can be routed through its service's circuit breaker;
//! compensations always go straight to the service.

pub mod inventory;
pub mod orders;
pub mod payment;
pub mod steps;

use std::sync::Arc;

use common::{CustomerId, Money, OrderId, ProductId};
use resilience::{CircuitBreaker, CircuitBreakerConfig, ConfigError, TransientOnly};
use serde::{Deserialize, Serialize};

pub use inventory::{InMemoryInventoryService, InventoryService, ReservationResult};
pub use orders::{InMemoryOrderService, OrderService, OrderStatus};
pub use payment::{InMemoryPaymentService, PaymentResult, PaymentService};
pub use steps::{
    ChargePaymentStep, CreateOrderStep, ReserveInventoryStep, STEP_CHARGE_PAYMENT,
    STEP_CREATE_ORDER, STEP_RESERVE_INVENTORY,
};

use crate::step::{ProtectedStep, SagaStep};

/// One line of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Money,
}

impl OrderLine {
    pub fn new(product_id: ProductId, quantity: u32, unit_price: Money) -> Self {
        Self {
            product_id,
            quantity,
            unit_price,
        }
    }

    /// Line total, or `None` if it does not fit in a `Money`.
    pub fn total(&self) -> Option<Money> {
        self.unit_price.checked_times(self.quantity)
    }
}

/// Everything the fulfillment steps need to know about the order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FulfillmentRequest {
    pub order_id: OrderId,
    pub customer_id: CustomerId,
    pub lines: Vec<OrderLine>,
}

impl FulfillmentRequest {
    /// Creates a request for a new order with a fresh id.
    pub fn new(customer_id: CustomerId, lines: Vec<OrderLine>) -> Self {
        Self {
            order_id: OrderId::new(),
            customer_id,
            lines,
        }
    }

    /// Order total, or `None` on overflow.
    pub fn total(&self) -> Option<Money> {
        self.lines
            .iter()
            .try_fold(Money::default(), |acc, line| acc.checked_add(line.total()?))
    }
}

/// One breaker per downstream service, shared by every saga execution.
#[derive(Debug, Clone)]
pub struct FulfillmentBreakers {
    pub orders: Arc<CircuitBreaker<TransientOnly>>,
    pub inventory: Arc<CircuitBreaker<TransientOnly>>,
    pub payments: Arc<CircuitBreaker<TransientOnly>>,
}

impl FulfillmentBreakers {
    /// Creates all three breakers with the same thresholds.
    pub fn new(config: CircuitBreakerConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            orders: breaker("orders", config.clone())?,
            inventory: breaker("inventory", config.clone())?,
            payments: breaker("payments", config)?,
        })
    }

    /// Loads per-service thresholds from `ORDERS_BREAKER_*`,
    /// `INVENTORY_BREAKER_*` and `PAYMENTS_BREAKER_*`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            orders: breaker("orders", CircuitBreakerConfig::from_env("ORDERS_BREAKER")?)?,
            inventory: breaker(
                "inventory",
                CircuitBreakerConfig::from_env("INVENTORY_BREAKER")?,
            )?,
            payments: breaker(
                "payments",
                CircuitBreakerConfig::from_env("PAYMENTS_BREAKER")?,
            )?,
        })
    }
}

fn breaker(
    name: &str,
    config: CircuitBreakerConfig,
) -> Result<Arc<CircuitBreaker<TransientOnly>>, ConfigError> {
    CircuitBreaker::with_classifier(name, config, TransientOnly).map(Arc::new)
}

/// Assembles the fulfillment saga: create order, reserve inventory, charge.
///
/// With `breakers`, each forward action goes through its service's breaker.
pub fn order_fulfillment_steps<O, I, P>(
    request: FulfillmentRequest,
    orders: O,
    inventory: I,
    payment: P,
    breakers: Option<&FulfillmentBreakers>,
) -> Vec<Box<dyn SagaStep>>
where
    O: OrderService + 'static,
    I: InventoryService + 'static,
    P: PaymentService + 'static,
{
    let request = Arc::new(request);
    let create = CreateOrderStep::new(request.clone(), orders);
    let reserve = ReserveInventoryStep::new(request.clone(), inventory);
    let charge = ChargePaymentStep::new(request, payment);

    let steps: Vec<Box<dyn SagaStep>> = match breakers {
        Some(breakers) => vec![
            Box::new(ProtectedStep::new(create, breakers.orders.clone())),
            Box::new(ProtectedStep::new(reserve, breakers.inventory.clone())),
            Box::new(ProtectedStep::new(charge, breakers.payments.clone())),
        ],
        None => vec![Box::new(create), Box::new(reserve), Box::new(charge)],
    };
    steps
}
