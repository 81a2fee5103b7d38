//! HTTP entry point for the order fulfillment saga.
//!
//! Owns the lifecycle of the store handles: they are built here (or in the
//! binary) and injected into the [`SagaCoordinator`]. Requests are traced
//! with `tower-http`, and saga metrics are exported for Prometheus.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use saga::{SagaConfig, SagaCoordinator};
use store::{InMemoryInventoryStore, InMemoryOrderStore, InventoryStore, OrderStore};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state accessible from all handlers.
pub struct AppState<I: InventoryStore, O: OrderStore> {
    pub coordinator: SagaCoordinator<I, O>,
}

impl<I: InventoryStore, O: OrderStore> AppState<I, O> {
    /// Builds the state around injected store handles.
    pub fn new(inventory: I, orders: O, config: SagaConfig) -> Arc<Self> {
        Arc::new(Self {
            coordinator: SagaCoordinator::with_config(inventory, orders, config),
        })
    }
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<I, O>(state: Arc<AppState<I, O>>, metrics_handle: PrometheusHandle) -> Router
where
    I: InventoryStore + 'static,
    O: OrderStore + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check::<I, O>))
        .route("/items", post(routes::inventory::create::<I, O>))
        .route("/items/{item_id}", get(routes::inventory::get::<I, O>))
        .route("/orders", post(routes::orders::fulfill::<I, O>))
        .route("/orders/{id}", get(routes::orders::get::<I, O>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates application state backed by in-memory stores.
pub fn create_in_memory_state(
    config: SagaConfig,
) -> Arc<AppState<InMemoryInventoryStore, InMemoryOrderStore>> {
    AppState::new(
        InMemoryInventoryStore::new(),
        InMemoryOrderStore::new(),
        config,
    )
}
