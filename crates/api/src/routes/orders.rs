//! Order fulfillment endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{OrderId, OrderLineItem, OrderRecord, OrderRequest};
use serde::{Deserialize, Serialize};
use store::{InventoryStore, OrderStore};

use crate::AppState;
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct FulfillRequest {
    pub items: Vec<LineItemRequest>,
}

#[derive(Deserialize)]
pub struct LineItemRequest {
    pub item_id: String,
    pub quantity: u32,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub order_id: String,
    pub line_items: Vec<LineItemResponse>,
    pub created_at: String,
}

#[derive(Serialize)]
pub struct LineItemResponse {
    pub item_id: String,
    pub quantity: u32,
}

impl From<OrderRecord> for OrderResponse {
    fn from(record: OrderRecord) -> Self {
        Self {
            order_id: record.order_id.to_string(),
            line_items: record
                .line_items
                .into_iter()
                .map(|item| LineItemResponse {
                    item_id: item.item_id.to_string(),
                    quantity: item.quantity,
                })
                .collect(),
            created_at: record.created_at.to_rfc3339(),
        }
    }
}

// -- Handlers --

/// POST /orders: run the fulfillment saga for the submitted items.
#[tracing::instrument(skip_all)]
pub async fn fulfill<I, O>(
    State(state): State<Arc<AppState<I, O>>>,
    payload: Result<Json<FulfillRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError>
where
    I: InventoryStore + 'static,
    O: OrderStore + 'static,
{
    // Negative quantities and missing fields fail here, before the saga runs.
    let Json(req) = payload.map_err(|rejection| ApiError::MalformedOrder(rejection.body_text()))?;

    let order: OrderRequest = req
        .items
        .into_iter()
        .map(|item| OrderLineItem::new(item.item_id, item.quantity))
        .collect();

    let record = state.coordinator.fulfill(order).await?;

    Ok((StatusCode::CREATED, Json(record.into())))
}

/// GET /orders/{id}: load a persisted order record.
///
/// The order write runs alongside the stock decrements, so a saga that
/// failed at commit can still have written its record. Such a record is
/// served like any other; the `POST /orders` failure body (`order_id`,
/// `order_persisted`) is the only place the failure is reported.
#[tracing::instrument(skip(state))]
pub async fn get<I, O>(
    State(state): State<Arc<AppState<I, O>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError>
where
    I: InventoryStore + 'static,
    O: OrderStore + 'static,
{
    let order_id = parse_order_id(&id)?;
    let record = state
        .coordinator
        .orders()
        .get_order(order_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Order {id} not found")))?;

    Ok(Json(record.into()))
}

fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid ID format: {e}")))?;
    Ok(OrderId::from(uuid))
}
