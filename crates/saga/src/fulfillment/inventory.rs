//! Inventory service trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use common::OrderId;
use resilience::RemoteError;

use super::OrderLine;

const DEPENDENCY: &str = "inventory";

/// Result of a successful inventory reservation.
#[derive(Debug, Clone)]
pub struct ReservationResult {
    /// The reservation ID assigned by the inventory service.
    pub reservation_id: String,
}

/// Trait for inventory management operations.
#[async_trait]
pub trait InventoryService: Send + Sync {
    /// Reserves stock for the given order lines.
    async fn reserve(
        &self,
        order_id: OrderId,
        lines: &[OrderLine],
    ) -> Result<ReservationResult, RemoteError>;

    /// Releases a previously made reservation.
    async fn release(&self, reservation_id: &str) -> Result<(), RemoteError>;
}

#[derive(Debug, Default)]
struct InMemoryInventoryState {
    reservations: HashMap<String, (OrderId, Vec<OrderLine>)>,
    next_id: u32,
    released: u32,
    fail_on_reserve: bool,
    fail_on_release: bool,
}

/// In-memory inventory service for tests and the demo.
#[derive(Debug, Clone, Default)]
pub struct InMemoryInventoryService {
    state: Arc<RwLock<InMemoryInventoryState>>,
}

impl InMemoryInventoryService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every reserve call fail with a transient error.
    pub fn set_fail_on_reserve(&self, fail: bool) {
        self.write().fail_on_reserve = fail;
    }

    /// Makes every release call fail with a transient error.
    pub fn set_fail_on_release(&self, fail: bool) {
        self.write().fail_on_release = fail;
    }

    /// Returns the number of active reservations.
    pub fn reservation_count(&self) -> usize {
        self.read().reservations.len()
    }

    pub fn has_reservation(&self, reservation_id: &str) -> bool {
        self.read().reservations.contains_key(reservation_id)
    }

    /// Returns how many reservations have been released.
    pub fn released_count(&self) -> u32 {
        self.read().released
    }

    fn read(&self) -> RwLockReadGuard<'_, InMemoryInventoryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, InMemoryInventoryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl InventoryService for InMemoryInventoryService {
    async fn reserve(
        &self,
        order_id: OrderId,
        lines: &[OrderLine],
    ) -> Result<ReservationResult, RemoteError> {
        let mut state = self.write();

        if state.fail_on_reserve {
            return Err(RemoteError::transient(DEPENDENCY, "inventory service unavailable"));
        }

        state.next_id += 1;
        let reservation_id = format!("RES-{:04}", state.next_id);
        state
            .reservations
            .insert(reservation_id.clone(), (order_id, lines.to_vec()));

        Ok(ReservationResult { reservation_id })
    }

    async fn release(&self, reservation_id: &str) -> Result<(), RemoteError> {
        let mut state = self.write();

        if state.fail_on_release {
            return Err(RemoteError::transient(DEPENDENCY, "inventory service unavailable"));
        }

        // Releasing an unknown or already released reservation is a no-op.
        if state.reservations.remove(reservation_id).is_some() {
            state.released += 1;
        }
        Ok(())
    }
}
