//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use saga::{SagaError, SagaStage};
use store::StoreError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Order body that could not be decoded into line items.
    MalformedOrder(String),
    /// Fulfillment saga failure.
    Saga(SagaError),
    /// Store failure outside a saga.
    Store(StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                serde_json::json!({ "error": msg }),
            ),
            ApiError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({ "error": msg }),
            ),
            ApiError::MalformedOrder(reason) => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({
                    "error": "Malformed order request",
                    "stage": SagaStage::Validation,
                    "details": { "reason": reason },
                }),
            ),
            ApiError::Saga(err) => saga_error_to_response(err),
            ApiError::Store(err) => store_error_to_response(err),
        };

        (status, axum::Json(body)).into_response()
    }
}

fn saga_error_to_response(err: SagaError) -> (StatusCode, serde_json::Value) {
    let message = err.to_string();
    let stage = err.stage();

    let (status, details) = match &err {
        SagaError::InvalidOrder(invalid) => (StatusCode::BAD_REQUEST, serde_json::json!(invalid)),
        SagaError::Rejected(failure) => (StatusCode::CONFLICT, serde_json::json!(failure)),
        SagaError::CommitFailed(failure) => {
            tracing::error!(error = %message, "order commit failed");
            let status = if failure.is_transport() {
                StatusCode::SERVICE_UNAVAILABLE
            } else {
                StatusCode::CONFLICT
            };
            (status, serde_json::json!(failure))
        }
        SagaError::Transport { item_id, .. } => {
            tracing::error!(error = %message, "store failure during fulfillment");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                serde_json::json!({ "item_id": item_id }),
            )
        }
        SagaError::Cancelled { .. } => (StatusCode::SERVICE_UNAVAILABLE, serde_json::Value::Null),
    };

    (
        status,
        serde_json::json!({
            "error": message,
            "stage": stage,
            "details": details,
        }),
    )
}

fn store_error_to_response(err: StoreError) -> (StatusCode, serde_json::Value) {
    let status = match &err {
        StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        StoreError::InvalidRecord(_) => StatusCode::BAD_REQUEST,
        StoreError::InsufficientStock { .. } | StoreError::DuplicateOrder(_) => {
            StatusCode::CONFLICT
        }
        _ if err.is_transport() => {
            tracing::error!(error = %err, "store unavailable");
            StatusCode::SERVICE_UNAVAILABLE
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    (status, serde_json::json!({ "error": err.to_string() }))
}

impl From<SagaError> for ApiError {
    fn from(err: SagaError) -> Self {
        ApiError::Saga(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Store(err)
    }
}
