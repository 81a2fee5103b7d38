//! Per-item stock check.

use common::OrderLineItem;
use serde::Serialize;
use store::InventoryStore;

/// Outcome of checking one line item against the inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum ValidationVerdict {
    /// Enough units are in stock.
    Sufficient,
    /// The item exists but holds fewer units than requested.
    Insufficient { requested: u32, available: u64 },
    /// The item has no record, or its stock could not be read.
    ItemNotFound,
}

impl ValidationVerdict {
    pub fn is_sufficient(&self) -> bool {
        matches!(self, ValidationVerdict::Sufficient)
    }
}

/// Checks single line items against an [`InventoryStore`]. Read-only.
pub struct StockValidator<'a, I: InventoryStore> {
    inventory: &'a I,
}

impl<'a, I: InventoryStore> StockValidator<'a, I> {
    pub fn new(inventory: &'a I) -> Self {
        Self { inventory }
    }

    /// Looks up the item's stock and compares it with the requested quantity.
    ///
    /// Store failures are returned as errors, never folded into a verdict.
    pub async fn validate(&self, item: &OrderLineItem) -> store::Result<ValidationVerdict> {
        let verdict = match self.inventory.get_stock(&item.item_id).await? {
            None => ValidationVerdict::ItemNotFound,
            Some(available) if available < u64::from(item.quantity) => {
                ValidationVerdict::Insufficient {
                    requested: item.quantity,
                    available,
                }
            }
            Some(_) => ValidationVerdict::Sufficient,
        };

        tracing::debug!(item_id = %item.item_id, quantity = item.quantity, ?verdict, "stock checked");
        Ok(verdict)
    }
}
