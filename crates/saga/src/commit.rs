//! Commit stage.
//!
//! Two branches run concurrently and are joined:
//! - inventory: one `decrement_stock` per line item, all concurrent
//! - persistence: a single `put_order` with a freshly generated order ID
//!
//! Neither branch waits on the other. The stage succeeds only if both do.
//! Nothing is rolled back on failure; the returned [`CommitFailure`] lists
//! what took effect.

use common::{OrderId, OrderLineItem, OrderRecord, OrderRequest};
use futures_util::future::join_all;
use store::{InventoryStore, OrderStore, StoreError};

use crate::cancel::{self, CancelSignal};
use crate::config::SagaConfig;
use crate::error::{AppliedDecrement, CommitFailure, FailedDecrement};

enum DecrementOutcome {
    Applied { remaining: u64 },
    Failed(StoreError),
    Skipped,
}

/// Decrements stock for every line item and persists the order record.
///
/// In-flight decrements are never abandoned: a transport failure on one item
/// cancels the group so decrements not yet issued are skipped, but issued
/// ones run until they finish or time out.
#[tracing::instrument(skip_all, fields(line_items = order.len()))]
pub async fn commit<I, O>(
    inventory: &I,
    orders: &O,
    order: &OrderRequest,
    config: &SagaConfig,
    cancel: &CancelSignal,
) -> Result<OrderRecord, CommitFailure>
where
    I: InventoryStore,
    O: OrderStore,
{
    let record = OrderRecord::new(OrderId::new(), order.line_items().to_vec());
    let group = cancel.child();

    let decrements = join_all(
        order
            .line_items()
            .iter()
            .map(|item| decrement(inventory, item, config, &group)),
    );
    let persist = async {
        if cancel.is_cancelled() {
            return Err(StoreError::Unavailable(
                "saga cancelled before the order was written".to_string(),
            ));
        }
        cancel::with_timeout(config.store_timeout, orders.put_order(&record)).await
    };

    let (outcomes, persisted) = tokio::join!(decrements, persist);

    let mut applied = Vec::new();
    let mut failed = Vec::new();
    let mut skipped = Vec::new();
    for (item, outcome) in order.line_items().iter().zip(outcomes) {
        match outcome {
            DecrementOutcome::Applied { remaining } => applied.push(AppliedDecrement {
                item_id: item.item_id.clone(),
                quantity: item.quantity,
                remaining,
            }),
            DecrementOutcome::Failed(err) => failed.push(FailedDecrement {
                item_id: item.item_id.clone(),
                quantity: item.quantity,
                reason: err.to_string(),
                transport: err.is_transport(),
            }),
            DecrementOutcome::Skipped => skipped.push(item.item_id.clone()),
        }
    }
    metrics::counter!("stock_decrements_total").increment(applied.len() as u64);

    let persistence_error = match &persisted {
        Ok(()) => None,
        Err(err) => {
            tracing::error!(order_id = %record.order_id, error = %err, "order write failed");
            Some(err.to_string())
        }
    };

    if failed.is_empty() && skipped.is_empty() && persistence_error.is_none() {
        return Ok(record);
    }

    Err(CommitFailure {
        order_id: record.order_id,
        applied,
        failed,
        skipped,
        order_persisted: persistence_error.is_none(),
        persistence_error,
    })
}

async fn decrement<I: InventoryStore>(
    inventory: &I,
    item: &OrderLineItem,
    config: &SagaConfig,
    group: &CancelSignal,
) -> DecrementOutcome {
    if group.is_cancelled() {
        return DecrementOutcome::Skipped;
    }

    let result = cancel::with_timeout(
        config.store_timeout,
        inventory.decrement_stock(&item.item_id, item.quantity),
    )
    .await;

    match result {
        Ok(remaining) => {
            tracing::debug!(item_id = %item.item_id, quantity = item.quantity, remaining, "stock decremented");
            DecrementOutcome::Applied { remaining }
        }
        Err(err) => {
            if err.is_transport() {
                tracing::error!(item_id = %item.item_id, error = %err, "decrement failed");
                group.cancel();
            } else {
                tracing::warn!(item_id = %item.item_id, error = %err, "decrement rejected");
            }
            DecrementOutcome::Failed(err)
        }
    }
}
