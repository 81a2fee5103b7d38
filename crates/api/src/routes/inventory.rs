//! Store item endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use common::{ItemId, StockRecord};
use serde::{Deserialize, Serialize};
use store::{InventoryStore, OrderStore};

use crate::AppState;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct CreateItemRequest {
    pub item_id: Option<String>,
    pub quantity: Option<u64>,
}

#[derive(Serialize)]
pub struct StockResponse {
    pub item_id: String,
    pub stock: u64,
}

/// POST /items: create or restock a store item.
///
/// A body that does not decode, a blank `item_id`, or a zero `quantity` is
/// answered with 400 "Missing required fields".
#[tracing::instrument(skip_all)]
pub async fn create<I, O>(
    State(state): State<Arc<AppState<I, O>>>,
    payload: Result<Json<CreateItemRequest>, JsonRejection>,
) -> Result<Json<StockResponse>, ApiError>
where
    I: InventoryStore + 'static,
    O: OrderStore + 'static,
{
    let missing_fields = || ApiError::BadRequest("Missing required fields".to_string());

    let Json(req) = payload.map_err(|rejection| {
        tracing::debug!(error = %rejection.body_text(), "undecodable store item body");
        missing_fields()
    })?;
    let item_id = req
        .item_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(missing_fields)?;
    let stock = req.quantity.filter(|q| *q > 0).ok_or_else(missing_fields)?;

    let record = StockRecord::new(item_id, stock);
    state.coordinator.inventory().put_stock(record.clone()).await?;
    tracing::info!(item_id = %record.item_id, stock, "store item created");

    Ok(Json(StockResponse {
        item_id: record.item_id.to_string(),
        stock: record.stock,
    }))
}

/// GET /items/{item_id}: current stock of a store item.
#[tracing::instrument(skip(state))]
pub async fn get<I, O>(
    State(state): State<Arc<AppState<I, O>>>,
    Path(item_id): Path<String>,
) -> Result<Json<StockResponse>, ApiError>
where
    I: InventoryStore + 'static,
    O: OrderStore + 'static,
{
    let stock = state
        .coordinator
        .inventory()
        .get_stock(&ItemId::new(item_id.as_str()))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Item {item_id} not found")))?;

    Ok(Json(StockResponse { item_id, stock }))
}
