use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;
use std::time::Duration;

use super::AppState;

/// Health check endpoint
/// Returns 200 OK if the service is running
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({
        "status": "healthy",
        "service": "logkeep",
        "version": env!("CARGO_PKG_VERSION"),
    })))
}

/// Readiness check endpoint
///
/// Looks up id 0, which never exists: a clean not-found means the store
/// answered queries.
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let ctx = state.op_context();
    match state.repo.get_by_id(&ctx, 0, false, Duration::ZERO).await {
        Ok(_) => ready(),
        Err(e) if e.is_not_found() => ready(),
        Err(e) => (StatusCode::SERVICE_UNAVAILABLE, Json(json!({
            "status": "unavailable",
            "service": "logkeep",
            "reason": e.to_string(),
        }))),
    }
}

fn ready() -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::OK, Json(json!({
        "status": "ready",
        "service": "logkeep",
    })))
}

/// Handle /metrics endpoint
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (StatusCode::NOT_FOUND, "metrics disabled".to_string()),
    }
}
