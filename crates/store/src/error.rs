use std::time::Duration;

use common::{ItemId, OrderId};
use thiserror::Error;

/// Errors that can occur when interacting with a store.
///
/// Business-rule violations (`NotFound`, `InsufficientStock`,
/// `DuplicateOrder`, `InvalidRecord`) are kept apart from infrastructure
/// failures; see [`StoreError::is_transport`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// No stock record exists for the item.
    #[error("Item not found: {0}")]
    NotFound(ItemId),

    /// The decrement would take the stock below zero.
    #[error("Insufficient stock for {item_id}: requested {requested}, available {available}")]
    InsufficientStock {
        item_id: ItemId,
        requested: u32,
        available: u64,
    },

    /// An order with this ID has already been written.
    #[error("Order already exists: {0}")]
    DuplicateOrder(OrderId),

    /// A record could not be represented in the store.
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// The store did not answer within the allotted time.
    #[error("Store call timed out after {0:?}")]
    Timeout(Duration),

    /// The store could not be reached.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Returns true for infrastructure failures (timeouts, unreachable
    /// store, driver errors) as opposed to business-rule violations.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            StoreError::Timeout(_)
                | StoreError::Unavailable(_)
                | StoreError::Database(_)
                | StoreError::Migration(_)
                | StoreError::Serialization(_)
        )
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn business_errors_are_not_transport() {
        assert!(!StoreError::NotFound(ItemId::new("sku-1")).is_transport());
        assert!(
            !StoreError::InsufficientStock {
                item_id: ItemId::new("sku-1"),
                requested: 3,
                available: 2,
            }
            .is_transport()
        );
        assert!(!StoreError::DuplicateOrder(OrderId::new()).is_transport());
    }

    #[test]
    fn infrastructure_errors_are_transport() {
        assert!(StoreError::Timeout(Duration::from_millis(5)).is_transport());
        assert!(StoreError::Unavailable("connection refused".into()).is_transport());
        assert!(StoreError::Database(sqlx::Error::PoolTimedOut).is_transport());
    }

    #[test]
    fn insufficient_stock_message() {
        let err = StoreError::InsufficientStock {
            item_id: ItemId::new("sku-1"),
            requested: 3,
            available: 2,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for sku-1: requested 3, available 2"
        );
    }
}
