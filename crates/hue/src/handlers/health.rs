//! health check endpoint handler

use axum::{Json, extract::State};
use serde::Serialize;

use crate::AppState;

/// health check response body
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
}

/// GET /health - unauthenticated liveness check
pub async fn health(State(_state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "hue",
        version: env!("CARGO_PKG_VERSION"),
    })
}
