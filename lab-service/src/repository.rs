use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

use crate::error::{LabError, LabResult};
use crate::models::{order_sequence, LabOrder};

/// Order numbers are unique across all clinics, since the public lookup
/// does not know which clinic issued one.
#[async_trait]
pub trait LabRepository: Send + Sync {
    /// Store a new order; a taken order number is `DuplicateOrder`
    async fn insert_order(&self, order: LabOrder) -> LabResult<LabOrder>;

    async fn find_by_order_number(&self, order_number: &str) -> LabResult<Option<LabOrder>>;

    /// Highest daily sequence among order numbers starting with `prefix`
    /// (`LAB-YYYYMMDD-`), 0 when there are none
    async fn max_sequence_with_prefix(&self, prefix: &str) -> LabResult<u32>;
}

/// In-memory repository keyed by order number
#[derive(Clone, Default)]
pub struct InMemoryLabRepository {
    orders: Arc<DashMap<String, LabOrder>>,
}

impl InMemoryLabRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LabRepository for InMemoryLabRepository {
    async fn insert_order(&self, order: LabOrder) -> LabResult<LabOrder> {
        match self.orders.entry(order.order_number.clone()) {
            Entry::Occupied(_) => Err(LabError::DuplicateOrder(order.order_number)),
            Entry::Vacant(slot) => {
                slot.insert(order.clone());
                Ok(order)
            }
        }
    }

    async fn find_by_order_number(&self, order_number: &str) -> LabResult<Option<LabOrder>> {
        Ok(self.orders.get(order_number).map(|o| o.value().clone()))
    }

    async fn max_sequence_with_prefix(&self, prefix: &str) -> LabResult<u32> {
        Ok(self
            .orders
            .iter()
            .filter(|o| o.key().starts_with(prefix))
            .filter_map(|o| order_sequence(o.key()))
            .max()
            .unwrap_or(0))
    }
}
