use async_trait::async_trait;
use common::{ItemId, StockRecord};

use crate::Result;

/// Key-value store of stock counts, keyed by item identifier.
///
/// Implementations must make [`InventoryStore::decrement_stock`] atomic per
/// key: the check against the current stock and the write happen as one
/// conditional update. Callers hold no locks of their own.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Returns the current stock for an item.
    ///
    /// Returns `None` if the item has no record, or if its stock field is
    /// missing or cannot be read as a non-negative count.
    async fn get_stock(&self, item_id: &ItemId) -> Result<Option<u64>>;

    /// Removes `quantity` units from an item's stock and returns what remains.
    ///
    /// Fails with `NotFound` if the item has no readable record and with
    /// `InsufficientStock` if fewer than `quantity` units are held. Stock is
    /// never clamped at zero.
    async fn decrement_stock(&self, item_id: &ItemId, quantity: u32) -> Result<u64>;

    /// Creates or replaces the stock record for an item.
    async fn put_stock(&self, record: StockRecord) -> Result<()>;
}
