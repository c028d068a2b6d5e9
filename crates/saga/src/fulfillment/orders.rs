//! Order service trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use common::{CustomerId, Money, OrderId};
use resilience::RemoteError;

const DEPENDENCY: &str = "orders";

/// Lifecycle of an order as the order service sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Placed,
    Cancelled,
}

/// Trait for order management operations.
#[async_trait]
pub trait OrderService: Send + Sync {
    /// Places an order under a caller-chosen id.
    async fn create(
        &self,
        order_id: OrderId,
        customer_id: CustomerId,
        total: Money,
    ) -> Result<(), RemoteError>;

    /// Cancels a placed order. Cancelling twice is not an error.
    async fn cancel(&self, order_id: OrderId) -> Result<(), RemoteError>;
}

#[derive(Debug, Default)]
struct InMemoryOrderState {
    orders: HashMap<OrderId, (CustomerId, Money, OrderStatus)>,
    fail_on_create: bool,
    fail_on_cancel: bool,
}

/// In-memory order service for tests and the demo.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderService {
    state: Arc<RwLock<InMemoryOrderState>>,
}

impl InMemoryOrderService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every create call fail with a transient error.
    pub fn set_fail_on_create(&self, fail: bool) {
        self.write().fail_on_create = fail;
    }

    /// Makes every cancel call fail with a transient error.
    pub fn set_fail_on_cancel(&self, fail: bool) {
        self.write().fail_on_cancel = fail;
    }

    pub fn order_count(&self) -> usize {
        self.read().orders.len()
    }

    pub fn order_status(&self, order_id: OrderId) -> Option<OrderStatus> {
        self.read().orders.get(&order_id).map(|(_, _, status)| *status)
    }

    fn read(&self) -> RwLockReadGuard<'_, InMemoryOrderState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, InMemoryOrderState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl OrderService for InMemoryOrderService {
    async fn create(
        &self,
        order_id: OrderId,
        customer_id: CustomerId,
        total: Money,
    ) -> Result<(), RemoteError> {
        let mut state = self.write();

        if state.fail_on_create {
            return Err(RemoteError::transient(DEPENDENCY, "order service unavailable"));
        }
        if !total.is_positive() {
            return Err(RemoteError::rejected(
                DEPENDENCY,
                format!("order total must be positive, got {total}"),
            ));
        }

        state
            .orders
            .insert(order_id, (customer_id, total, OrderStatus::Placed));
        Ok(())
    }

    async fn cancel(&self, order_id: OrderId) -> Result<(), RemoteError> {
        let mut state = self.write();

        if state.fail_on_cancel {
            return Err(RemoteError::transient(DEPENDENCY, "order service unavailable"));
        }

        match state.orders.get_mut(&order_id) {
            Some((_, _, status)) => {
                *status = OrderStatus::Cancelled;
                Ok(())
            }
            None => Err(RemoteError::rejected(
                DEPENDENCY,
                format!("unknown order {order_id}"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_cancel() {
        let service = InMemoryOrderService::new();
        let order_id = OrderId::new();

        service
            .create(order_id, CustomerId::new(), Money::from_cents(2500))
            .await
            .unwrap();
        assert_eq!(service.order_status(order_id), Some(OrderStatus::Placed));

        service.cancel(order_id).await.unwrap();
        service.cancel(order_id).await.unwrap();
        assert_eq!(service.order_status(order_id), Some(OrderStatus::Cancelled));
        assert_eq!(service.order_count(), 1);
    }

    #[tokio::test]
    async fn test_rejects_empty_order() {
        let service = InMemoryOrderService::new();
        let err = service
            .create(OrderId::new(), CustomerId::new(), Money::from_cents(0))
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::Rejected { .. }));
        assert_eq!(service.order_count(), 0);
    }

    #[tokio::test]
    async fn test_fail_on_create() {
        let service = InMemoryOrderService::new();
        service.set_fail_on_create(true);

        let result = service
            .create(OrderId::new(), CustomerId::new(), Money::from_cents(100))
            .await;
        assert!(matches!(result, Err(RemoteError::Transient { .. })));
        assert_eq!(service.order_count(), 0);
    }
}
