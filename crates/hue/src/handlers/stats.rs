//! aggregate statistics endpoint.

use axum::{Json, extract::State};
use serde::Serialize;

use crate::AppState;
use crate::handlers::{ApiError, ApiSecret, ResultExt};

/// system-wide counters.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub users: u64,
    pub nodes: u64,
    pub services: u64,
    pub total_upload: i64,
    pub total_download: i64,
}

/// get aggregate statistics.
///
/// `GET /api/v1/stats`
pub async fn get_stats(
    _auth: ApiSecret,
    State(state): State<AppState>,
) -> Result<Json<StatsResponse>, ApiError> {
    let users = state.meta.count_users().await.map_internal()?;
    let nodes = state.meta.count_nodes().await.map_internal()?;
    let services = state.meta.count_services().await.map_internal()?;
    let (total_upload, total_download) = state.meta.total_node_usage().await.map_internal()?;

    Ok(Json(StatsResponse {
        users,
        nodes,
        services,
        total_upload,
        total_download,
    }))
}
