use async_trait::async_trait;
use common::{OrderId, OrderRecord};

use crate::Result;

/// Append-only store of fulfilled orders.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Writes a new order record.
    ///
    /// Fails with `DuplicateOrder` if a record with the same ID exists;
    /// records are never overwritten.
    async fn put_order(&self, record: &OrderRecord) -> Result<()>;

    /// Loads an order record by ID.
    async fn get_order(&self, order_id: OrderId) -> Result<Option<OrderRecord>>;
}
