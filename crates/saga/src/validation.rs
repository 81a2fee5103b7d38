//! Fan-out validation stage.
//!
//! Every line item is checked concurrently and the stage waits for all of
//! them before deciding, so a rejection names every short item at once.
//! The stage only reads; a failed validation leaves nothing to undo.

use common::{ItemId, OrderRequest};
use futures_util::future::join_all;
use store::{InventoryStore, StoreError};

use crate::cancel::{self, CancelSignal, Guarded};
use crate::config::SagaConfig;
use crate::error::{ItemVerdict, SagaError, ValidationFailure};
use crate::state::SagaStage;
use crate::validator::{StockValidator, ValidationVerdict};

enum ItemCheck {
    Verdict(ValidationVerdict),
    Transport(StoreError),
    Cancelled,
}

/// Checks stock for every line item of `order`.
///
/// Business failures do not short-circuit: every verdict is collected. The
/// first transport error cancels the stage's outstanding reads and fails the
/// stage with [`SagaError::Transport`].
#[tracing::instrument(skip_all, fields(line_items = order.len()))]
pub async fn validate_all<I: InventoryStore>(
    inventory: &I,
    order: &OrderRequest,
    config: &SagaConfig,
    cancel: &CancelSignal,
) -> Result<(), SagaError> {
    let validator = StockValidator::new(inventory);
    let group = cancel.child();

    let checks = order.line_items().iter().map(|item| {
        let validator = &validator;
        let group = &group;
        async move {
            let outcome =
                cancel::abandonable(config.store_timeout, group, validator.validate(item)).await;
            match outcome {
                Guarded::Completed(Ok(verdict)) => ItemCheck::Verdict(verdict),
                Guarded::Completed(Err(err)) => {
                    tracing::error!(item_id = %item.item_id, error = %err, "stock check failed");
                    group.cancel();
                    ItemCheck::Transport(err)
                }
                Guarded::Cancelled => ItemCheck::Cancelled,
            }
        }
    });
    let checks = join_all(checks).await;

    let mut failures = Vec::new();
    let mut transport: Option<(ItemId, StoreError)> = None;
    let mut cancelled = false;

    for (item, check) in order.line_items().iter().zip(checks) {
        match check {
            ItemCheck::Verdict(verdict) if verdict.is_sufficient() => {}
            ItemCheck::Verdict(verdict) => failures.push(ItemVerdict {
                item_id: item.item_id.clone(),
                quantity: item.quantity,
                verdict,
            }),
            ItemCheck::Transport(err) => {
                if transport.is_none() {
                    transport = Some((item.item_id.clone(), err));
                }
            }
            ItemCheck::Cancelled => cancelled = true,
        }
    }

    if let Some((item_id, source)) = transport {
        return Err(SagaError::Transport {
            stage: SagaStage::Validation,
            item_id,
            source,
        });
    }
    if cancelled || cancel.is_cancelled() {
        return Err(SagaError::Cancelled {
            stage: SagaStage::Validation,
        });
    }
    if !failures.is_empty() {
        return Err(SagaError::Rejected(ValidationFailure { items: failures }));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::OrderLineItem;
    use std::time::Duration;
    use store::InMemoryInventoryStore;

    fn order(items: &[(&str, u32)]) -> OrderRequest {
        items
            .iter()
            .map(|(id, qty)| OrderLineItem::new(*id, *qty))
            .collect()
    }

    #[tokio::test]
    async fn passes_when_every_item_is_covered() {
        let inventory = InMemoryInventoryStore::with_stock([("sku-1", 5), ("sku-2", 1)]);
        let result = validate_all(
            &inventory,
            &order(&[("sku-1", 5), ("sku-2", 1)]),
            &SagaConfig::default(),
            &CancelSignal::new(),
        )
        .await;

        assert!(result.is_ok());
        assert_eq!(inventory.read_calls(), 2);
    }

    #[tokio::test]
    async fn collects_every_failing_item() {
        let inventory = InMemoryInventoryStore::with_stock([("sku-1", 5), ("sku-2", 0)]);
        let err = validate_all(
            &inventory,
            &order(&[("sku-2", 1), ("sku-1", 1), ("sku-3", 1)]),
            &SagaConfig::default(),
            &CancelSignal::new(),
        )
        .await
        .unwrap_err();

        let SagaError::Rejected(failure) = err else {
            panic!("expected rejection, got {err:?}");
        };
        assert_eq!(failure.items.len(), 2);
        assert_eq!(failure.items[0].item_id.as_str(), "sku-2");
        assert!(matches!(
            failure.verdict_for("sku-2"),
            Some(ValidationVerdict::Insufficient { .. })
        ));
        assert_eq!(
            failure.verdict_for("sku-3"),
            Some(ValidationVerdict::ItemNotFound)
        );
        // Every item was checked despite the early failure.
        assert_eq!(inventory.read_calls(), 3);
    }

    #[tokio::test]
    async fn store_failure_fails_the_stage_as_transport() {
        let inventory = InMemoryInventoryStore::with_stock([("sku-1", 5), ("sku-2", 5)]);
        inventory.fail_reads_for("sku-2").await;

        let err = validate_all(
            &inventory,
            &order(&[("sku-1", 1), ("sku-2", 1)]),
            &SagaConfig::default(),
            &CancelSignal::new(),
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            SagaError::Transport { ref item_id, .. } if item_id.as_str() == "sku-2"
        ));
    }

    #[tokio::test]
    async fn slow_store_times_out() {
        let inventory = InMemoryInventoryStore::with_stock([("sku-1", 5)]);
        inventory.set_read_latency(Duration::from_millis(200)).await;

        let err = validate_all(
            &inventory,
            &order(&[("sku-1", 1)]),
            &SagaConfig::with_store_timeout(Duration::from_millis(20)),
            &CancelSignal::new(),
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            SagaError::Transport {
                source: StoreError::Timeout(_),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn caller_cancellation_stops_the_stage() {
        let inventory = InMemoryInventoryStore::with_stock([("sku-1", 5)]);
        inventory.set_read_latency(Duration::from_secs(5)).await;
        let cancel = CancelSignal::new();

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });

        let err = tokio::time::timeout(
            Duration::from_secs(1),
            validate_all(
                &inventory,
                &order(&[("sku-1", 1)]),
                &SagaConfig::default(),
                &cancel,
            ),
        )
        .await
        .expect("cancellation should end the stage early")
        .unwrap_err();

        assert!(matches!(
            err,
            SagaError::Cancelled {
                stage: SagaStage::Validation
            }
        ));
    }
}
