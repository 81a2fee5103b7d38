//! Saga coordinator for order fulfillment.

use std::time::Instant;

use common::{OrderRecord, OrderRequest};
use store::{InventoryStore, OrderStore};

use crate::cancel::CancelSignal;
use crate::commit;
use crate::config::SagaConfig;
use crate::error::SagaError;
use crate::state::{SagaStage, SagaState};
use crate::validation;

/// The saga type identifier used in logs.
pub const SAGA_TYPE: &str = "OrderFulfillment";

/// Orchestrates order fulfillment sagas.
///
/// The coordinator runs the validation stage, and only if every line item is
/// covered, the commit stage. Store handles are injected; their lifecycle
/// belongs to whoever builds the coordinator. No retries are attempted.
pub struct SagaCoordinator<I, O>
where
    I: InventoryStore,
    O: OrderStore,
{
    inventory: I,
    orders: O,
    config: SagaConfig,
}

impl<I, O> SagaCoordinator<I, O>
where
    I: InventoryStore,
    O: OrderStore,
{
    /// Creates a new saga coordinator with the default config.
    pub fn new(inventory: I, orders: O) -> Self {
        Self::with_config(inventory, orders, SagaConfig::default())
    }

    /// Creates a new saga coordinator with an explicit config.
    pub fn with_config(inventory: I, orders: O, config: SagaConfig) -> Self {
        Self {
            inventory,
            orders,
            config,
        }
    }

    /// The injected inventory store.
    pub fn inventory(&self) -> &I {
        &self.inventory
    }

    /// The injected order store.
    pub fn orders(&self) -> &O {
        &self.orders
    }

    pub fn config(&self) -> &SagaConfig {
        &self.config
    }

    /// Fulfills an order: validates stock for every item, then decrements
    /// stock and persists the order record.
    ///
    /// Returns the persisted record on success. On a validation failure
    /// nothing has been mutated. On a commit failure the error lists the
    /// effects that were applied; they are not reverted.
    pub async fn fulfill(&self, order: OrderRequest) -> Result<OrderRecord, SagaError> {
        self.fulfill_with_cancel(order, &CancelSignal::new()).await
    }

    /// Same as [`SagaCoordinator::fulfill`], aborting when `cancel` fires.
    ///
    /// Cancellation during validation rejects the order. Cancellation during
    /// commit skips effects that were not yet issued; issued writes finish.
    #[tracing::instrument(skip_all, fields(saga_type = SAGA_TYPE, line_items = order.len()))]
    pub async fn fulfill_with_cancel(
        &self,
        order: OrderRequest,
        cancel: &CancelSignal,
    ) -> Result<OrderRecord, SagaError> {
        metrics::counter!("saga_executions_total").increment(1);
        tracing::info!("fulfillment started");
        let saga_start = Instant::now();
        let mut state = SagaState::default();

        let result = self.run(&order, cancel, &mut state).await;

        let duration = saga_start.elapsed().as_secs_f64();
        metrics::histogram!("saga_duration_seconds").record(duration);

        let counter = outcome_counter(&result);
        metrics::counter!(counter).increment(1);
        match &result {
            Ok(record) => {
                tracing::info!(order_id = %record.order_id, duration, "order fulfilled");
            }
            Err(err) if counter == REJECTED_COUNTER => {
                tracing::warn!(error = %err, duration, "order rejected");
            }
            Err(err) => {
                tracing::warn!(error = %err, stage = %err.stage(), %state, duration, "order failed");
            }
        }

        result
    }

    async fn run(
        &self,
        order: &OrderRequest,
        cancel: &CancelSignal,
        state: &mut SagaState,
    ) -> Result<OrderRecord, SagaError> {
        state.advance(SagaState::Validating);

        if let Err(invalid) = order.check() {
            state.advance(SagaState::Rejected);
            return Err(invalid.into());
        }

        if let Err(err) =
            validation::validate_all(&self.inventory, order, &self.config, cancel).await
        {
            state.advance(SagaState::Rejected);
            return Err(err);
        }

        // No new stage once the caller has given up.
        if cancel.is_cancelled() {
            state.advance(SagaState::Rejected);
            return Err(SagaError::Cancelled {
                stage: SagaStage::Validation,
            });
        }

        state.advance(SagaState::Committing);
        match commit::commit(&self.inventory, &self.orders, order, &self.config, cancel).await {
            Ok(record) => {
                state.advance(SagaState::Fulfilled);
                Ok(record)
            }
            Err(failure) => {
                state.advance(SagaState::Failed);
                Err(SagaError::CommitFailed(failure))
            }
        }
    }
}

const FULFILLED_COUNTER: &str = "saga_fulfilled_total";
const REJECTED_COUNTER: &str = "saga_rejected_total";
const FAILED_COUNTER: &str = "saga_failed_total";

/// Counter a finished saga is recorded under.
///
/// Only business rejections count as rejected. Store faults and
/// cancellation count as failed, whichever stage they hit.
fn outcome_counter(result: &Result<OrderRecord, SagaError>) -> &'static str {
    match result {
        Ok(_) => FULFILLED_COUNTER,
        Err(SagaError::InvalidOrder(_) | SagaError::Rejected(_)) => REJECTED_COUNTER,
        Err(
            SagaError::Transport { .. } | SagaError::Cancelled { .. } | SagaError::CommitFailed(_),
        ) => FAILED_COUNTER,
    }
}
