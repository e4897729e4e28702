//! Liveness, health and cache introspection handlers

use crate::{error::ServerResult, server::ServerState};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};

/// Container liveness probe, answered without touching the cache
pub async fn ping() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain")],
        "OK",
    )
}

/// Basic health check with cache occupancy
pub async fn health_check(State(state): State<ServerState>) -> ServerResult<Json<Value>> {
    Ok(Json(json!({
        "status": "ok",
        "service": "drover-server",
        "version": crate::VERSION,
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "resident_models": state.cache.resident_count(),
        "capacity": state.cache.capacity(),
    })))
}

/// Resident models (least recently used first) and cache counters
pub async fn list_models(State(state): State<ServerState>) -> ServerResult<Json<Value>> {
    let models = state.cache.snapshot().await;
    let resident_count = models.len();

    Ok(Json(json!({
        "capacity": state.cache.capacity(),
        "overflow": state.cache.config().overflow,
        "resident_count": resident_count,
        "models": models,
        "stats": state.cache.stats(),
    })))
}
