//! Order fulfillment saga.
//!
//! A fulfillment runs in two stages separated by a barrier:
//! 1. Validate: check stock for every line item concurrently (read-only)
//! 2. Commit: decrement stock for every line item and persist the order
//!    record, both branches concurrently
//!
//! The commit stage never starts unless every line item validated as
//! sufficient. Decrements applied before a commit failure are reported, not
//! reverted.

pub mod cancel;
pub mod commit;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod state;
pub mod validation;
pub mod validator;

pub use cancel::CancelSignal;
pub use config::SagaConfig;
pub use coordinator::SagaCoordinator;
pub use error::{
    AppliedDecrement, CommitFailure, FailedDecrement, ItemVerdict, Result, SagaError,
    ValidationFailure,
};
pub use state::{SagaStage, SagaState};
pub use validator::{StockValidator, ValidationVerdict};
