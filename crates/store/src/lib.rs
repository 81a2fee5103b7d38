//! Stores consumed by the order fulfillment saga.
//!
//! The saga only depends on the [`InventoryStore`] and [`OrderStore`] traits.
//! Two back-ends are provided: in-memory stores for tests and local runs,
//! and PostgreSQL stores for deployments.

pub mod error;
pub mod inventory;
pub mod memory;
pub mod orders;
pub mod postgres;

pub use common::{ItemId, OrderId, OrderRecord, StockRecord};
pub use error::{Result, StoreError};
pub use inventory::InventoryStore;
pub use memory::{InMemoryInventoryStore, InMemoryOrderStore};
pub use orders::OrderStore;
pub use postgres::{PostgresInventoryStore, PostgresOrderStore, run_migrations};
