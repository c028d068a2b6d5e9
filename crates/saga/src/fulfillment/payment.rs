//! Payment service trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use common::{CustomerId, Money, OrderId};
use resilience::RemoteError;

const DEPENDENCY: &str = "payments";

/// Result of a successful payment charge.
#[derive(Debug, Clone)]
pub struct PaymentResult {
    /// The payment ID assigned by the payment service.
    pub payment_id: String,
}

/// Trait for payment processing operations.
#[async_trait]
pub trait PaymentService: Send + Sync {
    /// Charges a customer for an order.
    async fn charge(
        &self,
        order_id: OrderId,
        customer_id: CustomerId,
        amount: Money,
    ) -> Result<PaymentResult, RemoteError>;

    /// Refunds a previously made payment.
    async fn refund(&self, payment_id: &str) -> Result<(), RemoteError>;
}

#[derive(Debug, Default)]
struct InMemoryPaymentState {
    payments: HashMap<String, (OrderId, CustomerId, Money)>,
    next_id: u32,
    refunded: u32,
    fail_on_charge: bool,
    fail_on_refund: bool,
}

/// In-memory payment service for tests and the demo.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentService {
    state: Arc<RwLock<InMemoryPaymentState>>,
}

impl InMemoryPaymentService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every charge call fail with a transient error.
    pub fn set_fail_on_charge(&self, fail: bool) {
        self.write().fail_on_charge = fail;
    }

    /// Makes every refund call fail with a transient error.
    pub fn set_fail_on_refund(&self, fail: bool) {
        self.write().fail_on_refund = fail;
    }

    /// Returns the number of active payments.
    pub fn payment_count(&self) -> usize {
        self.read().payments.len()
    }

    pub fn has_payment(&self, payment_id: &str) -> bool {
        self.read().payments.contains_key(payment_id)
    }

    pub fn refunded_count(&self) -> u32 {
        self.read().refunded
    }

    fn read(&self) -> RwLockReadGuard<'_, InMemoryPaymentState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, InMemoryPaymentState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl PaymentService for InMemoryPaymentService {
    async fn charge(
        &self,
        order_id: OrderId,
        customer_id: CustomerId,
        amount: Money,
    ) -> Result<PaymentResult, RemoteError> {
        let mut state = self.write();

        if state.fail_on_charge {
            return Err(RemoteError::transient(DEPENDENCY, "payment gateway unavailable"));
        }

        state.next_id += 1;
        let payment_id = format!("PAY-{:04}", state.next_id);
        state
            .payments
            .insert(payment_id.clone(), (order_id, customer_id, amount));

        Ok(PaymentResult { payment_id })
    }

    async fn refund(&self, payment_id: &str) -> Result<(), RemoteError> {
        let mut state = self.write();

        if state.fail_on_refund {
            return Err(RemoteError::transient(DEPENDENCY, "payment gateway unavailable"));
        }

        if state.payments.remove(payment_id).is_some() {
            state.refunded += 1;
        }
        Ok(())
    }
}
