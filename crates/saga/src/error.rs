//! Saga error types.

use common::{InvalidOrder, ItemId, OrderId};
use serde::Serialize;
use store::StoreError;
use thiserror::Error;

use crate::state::{SagaStage, SagaState};
use crate::validator::ValidationVerdict;

/// Errors returned by [`SagaCoordinator::fulfill`](crate::SagaCoordinator::fulfill).
#[derive(Debug, Error)]
pub enum SagaError {
    /// The request broke a structural rule; no store was contacted.
    #[error("Invalid order: {0}")]
    InvalidOrder(#[from] InvalidOrder),

    /// At least one line item is short or unknown. Inventory is untouched.
    #[error("Order rejected: {0}")]
    Rejected(ValidationFailure),

    /// The commit stage did not fully succeed. Effects listed in the
    /// failure may already be applied.
    #[error("Order commit failed: {0}")]
    CommitFailed(CommitFailure),

    /// A store call failed or timed out.
    #[error("Store failure during {stage} for {item_id}: {source}")]
    Transport {
        stage: SagaStage,
        item_id: ItemId,
        source: StoreError,
    },

    /// The caller cancelled the saga.
    #[error("Saga cancelled during {stage}")]
    Cancelled { stage: SagaStage },
}

impl SagaError {
    /// The stage the saga was in when it failed.
    pub fn stage(&self) -> SagaStage {
        match self {
            SagaError::InvalidOrder(_) | SagaError::Rejected(_) => SagaStage::Validation,
            SagaError::CommitFailed(_) => SagaStage::Commit,
            SagaError::Transport { stage, .. } | SagaError::Cancelled { stage } => *stage,
        }
    }

    /// The terminal state the saga ended in.
    pub fn terminal_state(&self) -> SagaState {
        match self.stage() {
            SagaStage::Validation => SagaState::Rejected,
            SagaStage::Commit => SagaState::Failed,
        }
    }

    /// Returns true if the failure came from infrastructure rather than
    /// business rules.
    pub fn is_transport(&self) -> bool {
        match self {
            SagaError::Transport { .. } => true,
            SagaError::CommitFailed(failure) => failure.is_transport(),
            _ => false,
        }
    }
}

/// A line item that failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemVerdict {
    pub item_id: ItemId,
    pub quantity: u32,
    #[serde(flatten)]
    pub verdict: ValidationVerdict,
}

/// Every line item that did not validate as sufficient, in order position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationFailure {
    pub items: Vec<ItemVerdict>,
}

impl ValidationFailure {
    /// Returns the verdict recorded for an item, if it failed.
    pub fn verdict_for(&self, item_id: &str) -> Option<ValidationVerdict> {
        self.items
            .iter()
            .find(|i| i.item_id.as_str() == item_id)
            .map(|i| i.verdict)
    }
}

impl std::fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for item in &self.items {
            if !first {
                write!(f, ", ")?;
            }
            first = false;
            match item.verdict {
                ValidationVerdict::Insufficient {
                    requested,
                    available,
                } => write!(
                    f,
                    "{} insufficient (requested {requested}, available {available})",
                    item.item_id
                )?,
                ValidationVerdict::ItemNotFound => write!(f, "{} not found", item.item_id)?,
                ValidationVerdict::Sufficient => write!(f, "{} sufficient", item.item_id)?,
            }
        }
        Ok(())
    }
}

/// A decrement that was applied before the commit stage failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedDecrement {
    pub item_id: ItemId,
    pub quantity: u32,
    pub remaining: u64,
}

/// A decrement that did not apply, or whose outcome is unknown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedDecrement {
    pub item_id: ItemId,
    pub quantity: u32,
    pub reason: String,
    /// True for timeouts and unreachable stores. A timed-out decrement may
    /// still have been applied by the store.
    pub transport: bool,
}

/// Outcome of a failed commit stage.
///
/// The inventory and persistence branches run independently, so either may
/// have taken effect. Nothing here is rolled back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitFailure {
    /// The identifier generated for the order record.
    pub order_id: OrderId,
    pub applied: Vec<AppliedDecrement>,
    pub failed: Vec<FailedDecrement>,
    /// Items whose decrement was never issued because the stage was
    /// already cancelled.
    pub skipped: Vec<ItemId>,
    pub order_persisted: bool,
    pub persistence_error: Option<String>,
}

impl CommitFailure {
    /// Returns true if any part of the failure came from infrastructure.
    pub fn is_transport(&self) -> bool {
        self.failed.iter().any(|f| f.transport) || !self.skipped.is_empty()
    }

    /// Returns true if inventory or the order store were changed.
    pub fn has_partial_effects(&self) -> bool {
        !self.applied.is_empty() || self.order_persisted
    }
}

impl std::fmt::Display for CommitFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "order {}: {} decrement(s) applied, {} failed, {} skipped, order {}",
            self.order_id,
            self.applied.len(),
            self.failed.len(),
            self.skipped.len(),
            if self.order_persisted {
                "persisted"
            } else {
                "not persisted"
            }
        )?;
        if let Some(first) = self.failed.first() {
            write!(f, " (first failure: {}: {})", first.item_id, first.reason)?;
        }
        if let Some(err) = &self.persistence_error {
            write!(f, " (persistence: {err})")?;
        }
        Ok(())
    }
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, SagaError>;
