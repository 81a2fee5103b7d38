//! Health check endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::Serialize;
use store::{InventoryStore, OrderStore};

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub store_timeout_ms: u128,
}

/// GET /health: liveness plus the store timeout sagas run under.
pub async fn check<I, O>(State(state): State<Arc<AppState<I, O>>>) -> Json<HealthResponse>
where
    I: InventoryStore + 'static,
    O: OrderStore + 'static,
{
    Json(HealthResponse {
        status: "ok",
        store_timeout_ms: state.coordinator.config().store_timeout.as_millis(),
    })
}
