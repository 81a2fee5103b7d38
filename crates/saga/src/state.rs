//! Saga state machine.

use serde::{Deserialize, Serialize};

/// The state of a fulfillment saga in its lifecycle.
///
/// State transitions:
/// ```text
/// Started ──► Validating ──┬──► Committing ──┬──► Fulfilled
///                          │                 └──► Failed
///                          └──► Rejected
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SagaState {
    /// Saga has been created but no stage has run.
    #[default]
    Started,

    /// Stock is being checked for every line item.
    Validating,

    /// Stock is being decremented and the order persisted.
    Committing,

    /// Every decrement applied and the order was persisted (terminal state).
    Fulfilled,

    /// The order was refused before any mutation (terminal state).
    Rejected,

    /// The commit stage failed; some effects may have been applied (terminal state).
    Failed,
}

impl SagaState {
    /// Returns true if moving from this state to `next` is allowed.
    pub fn can_transition_to(&self, next: SagaState) -> bool {
        matches!(
            (self, next),
            (SagaState::Started, SagaState::Validating)
                | (SagaState::Validating, SagaState::Committing)
                | (SagaState::Validating, SagaState::Rejected)
                | (SagaState::Committing, SagaState::Fulfilled)
                | (SagaState::Committing, SagaState::Failed)
        )
    }

    /// Moves to `next`, logging the transition.
    pub(crate) fn advance(&mut self, next: SagaState) {
        debug_assert!(
            self.can_transition_to(next),
            "illegal saga transition {self} -> {next}"
        );
        tracing::debug!(from = %self, to = %next, "saga state transition");
        *self = next;
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SagaState::Fulfilled | SagaState::Rejected | SagaState::Failed
        )
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            SagaState::Started => "Started",
            SagaState::Validating => "Validating",
            SagaState::Committing => "Committing",
            SagaState::Fulfilled => "Fulfilled",
            SagaState::Rejected => "Rejected",
            SagaState::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for SagaState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The two barriers of a fulfillment saga.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SagaStage {
    Validation,
    Commit,
}

impl SagaStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            SagaStage::Validation => "validation",
            SagaStage::Commit => "commit",
        }
    }
}

impl std::fmt::Display for SagaStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
