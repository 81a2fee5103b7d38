//! Shared types for the order fulfillment system.
//!
//! These are the values exchanged between the saga orchestrator and the
//! inventory/order stores: identifiers, line items, order requests and the
//! records the stores own.

pub mod order;
pub mod types;

pub use order::{InvalidOrder, OrderLineItem, OrderRecord, OrderRequest, StockRecord};
pub use types::{ItemId, OrderId};
