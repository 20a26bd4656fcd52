//! Health and metrics handlers.

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

/// GET /health - Basic health check
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// GET /metrics - Prometheus metrics
pub async fn metrics_handler(Extension(state): Extension<Arc<AppState>>) -> Response {
    let body = state
        .metrics
        .as_ref()
        .map(|handle| handle.render())
        .unwrap_or_default();

    ([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body).into_response()
}
