//! Health and readiness check endpoints
//!
//! GET /health  - liveness probe (process is up)
//! GET /ready   - readiness probe (specification loaded, gateway installed)

use super::service::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

/// GET /health - liveness probe
///
/// Always returns 200 OK while the process is alive.
pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

/// GET /ready - readiness probe
///
/// 503 until the gateway is installed, then 200 with the number of
/// registered dispatch entries.
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    match state.service() {
        Some(service) => (
            StatusCode::OK,
            Json(json!({
                "status": "ready",
                "operations": service.dispatcher.len(),
                "title": service.spec.title,
            })),
        ),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "starting" })),
        ),
    }
}
