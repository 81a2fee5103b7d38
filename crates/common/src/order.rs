//! Order and stock value objects.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{ItemId, OrderId};

/// A single requested item and the quantity wanted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineItem {
    pub item_id: ItemId,
    pub quantity: u32,
}

impl OrderLineItem {
    /// Creates a new line item.
    pub fn new(item_id: impl Into<ItemId>, quantity: u32) -> Self {
        Self {
            item_id: item_id.into(),
            quantity,
        }
    }
}

/// Reasons an order request is rejected before any store is contacted.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InvalidOrder {
    /// The order has no line items.
    #[error("Order has no items")]
    NoItems,

    /// A line item has an empty item identifier.
    #[error("Line item {position} has no item id")]
    MissingItemId { position: usize },

    /// A line item asks for zero units.
    #[error("Invalid quantity for {item_id}: {quantity} (must be greater than 0)")]
    InvalidQuantity { item_id: ItemId, quantity: u32 },

    /// The same item id appears on more than one line.
    #[error("Item {item_id} is repeated at line item {position}")]
    DuplicateItem { item_id: ItemId, position: usize },
}

/// An inbound order: an ordered sequence of line items.
///
/// Request scoped. The saga consumes it and persists an [`OrderRecord`]
/// built from its line items on success.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    line_items: Vec<OrderLineItem>,
}

impl OrderRequest {
    /// Creates a request from line items. Call [`OrderRequest::check`] before use.
    pub fn new(line_items: Vec<OrderLineItem>) -> Self {
        Self { line_items }
    }

    /// Returns the line items in submission order.
    pub fn line_items(&self) -> &[OrderLineItem] {
        &self.line_items
    }

    /// Returns the number of line items.
    pub fn len(&self) -> usize {
        self.line_items.len()
    }

    /// Returns true if the request carries no line items.
    pub fn is_empty(&self) -> bool {
        self.line_items.is_empty()
    }

    /// Checks the structural invariants: at least one item, non-blank and
    /// unique item ids, positive quantities. Reports the first violation.
    ///
    /// Stock is validated per line, so each item id may appear only once.
    pub fn check(&self) -> Result<(), InvalidOrder> {
        if self.line_items.is_empty() {
            return Err(InvalidOrder::NoItems);
        }

        let mut seen = HashSet::with_capacity(self.line_items.len());
        for (position, item) in self.line_items.iter().enumerate() {
            if item.item_id.is_blank() {
                return Err(InvalidOrder::MissingItemId { position });
            }
            if item.quantity == 0 {
                return Err(InvalidOrder::InvalidQuantity {
                    item_id: item.item_id.clone(),
                    quantity: item.quantity,
                });
            }
            if !seen.insert(&item.item_id) {
                return Err(InvalidOrder::DuplicateItem {
                    item_id: item.item_id.clone(),
                    position,
                });
            }
        }

        Ok(())
    }

    /// Consumes the request, returning its line items.
    pub fn into_line_items(self) -> Vec<OrderLineItem> {
        self.line_items
    }
}

impl FromIterator<OrderLineItem> for OrderRequest {
    fn from_iter<T: IntoIterator<Item = OrderLineItem>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Stock count for one store item, as held by the inventory store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRecord {
    pub item_id: ItemId,
    pub stock: u64,
}

impl StockRecord {
    pub fn new(item_id: impl Into<ItemId>, stock: u64) -> Self {
        Self {
            item_id: item_id.into(),
            stock,
        }
    }

    /// Returns true if at least `quantity` units are in stock.
    pub fn covers(&self, quantity: u32) -> bool {
        self.stock >= u64::from(quantity)
    }
}

/// An order as persisted by the commit stage. Written once, never modified.
///
/// The record is written concurrently with the stock decrements, so its
/// presence alone does not mean every decrement was applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub order_id: OrderId,
    pub line_items: Vec<OrderLineItem>,
    pub created_at: DateTime<Utc>,
}

impl OrderRecord {
    /// Creates a record stamped with the current time.
    pub fn new(order_id: OrderId, line_items: Vec<OrderLineItem>) -> Self {
        Self {
            order_id,
            line_items,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_accepts_valid_request() {
        let order = OrderRequest::new(vec![
            OrderLineItem::new("sku-1", 3),
            OrderLineItem::new("sku-2", 1),
        ]);
        assert!(order.check().is_ok());
        assert_eq!(order.len(), 2);
    }

    #[test]
    fn check_rejects_empty_request() {
        let order = OrderRequest::default();
        assert!(order.is_empty());
        assert_eq!(order.check(), Err(InvalidOrder::NoItems));
    }

    #[test]
    fn check_rejects_zero_quantity() {
        let order = OrderRequest::new(vec![
            OrderLineItem::new("sku-1", 1),
            OrderLineItem::new("sku-2", 0),
        ]);
        assert_eq!(
            order.check(),
            Err(InvalidOrder::InvalidQuantity {
                item_id: ItemId::new("sku-2"),
                quantity: 0,
            })
        );
    }

    #[test]
    fn check_rejects_blank_item_id() {
        let order = OrderRequest::new(vec![OrderLineItem::new(" ", 1)]);
        assert_eq!(
            order.check(),
            Err(InvalidOrder::MissingItemId { position: 0 })
        );
    }

    #[test]
    fn check_rejects_repeated_item_id() {
        let order = OrderRequest::new(vec![
            OrderLineItem::new("sku-1", 3),
            OrderLineItem::new("sku-2", 1),
            OrderLineItem::new("sku-1", 3),
        ]);
        assert_eq!(
            order.check(),
            Err(InvalidOrder::DuplicateItem {
                item_id: ItemId::new("sku-1"),
                position: 2,
            })
        );
    }

    #[test]
    fn line_items_keep_submission_order() {
        let order: OrderRequest = ["b", "a", "c"]
            .into_iter()
            .map(|id| OrderLineItem::new(id, 1))
            .collect();
        let ids: Vec<&str> = order.line_items().iter().map(|i| i.item_id.as_str()).collect();
        assert_eq!(ids, ["b", "a", "c"]);
    }

    #[test]
    fn stock_record_covers() {
        let record = StockRecord::new("sku-1", 2);
        assert!(record.covers(2));
        assert!(!record.covers(3));
    }

    #[test]
    fn invalid_order_serializes_with_kind_tag() {
        let json = serde_json::to_value(InvalidOrder::NoItems).unwrap();
        assert_eq!(json["kind"], "no_items");
    }

    #[test]
    fn order_record_serialization() {
        let record = OrderRecord::new(OrderId::new(), vec![OrderLineItem::new("sku-1", 3)]);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["line_items"][0]["item_id"], "sku-1");
        assert_eq!(json["line_items"][0]["quantity"], 3);
        let back: OrderRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }
}
