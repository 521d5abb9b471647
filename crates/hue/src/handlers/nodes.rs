//! node endpoints for api v1.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Serialize;

use hue_types::{Node, NodeCreate};

use crate::AppState;
use crate::handlers::{ApiError, ApiSecret, OptionExt, ResultExt};

/// response wrapper for the list endpoint.
#[derive(Debug, Serialize)]
pub struct ListNodesResponse {
    pub nodes: Vec<Node>,
    pub total: usize,
}

/// list nodes.
///
/// `GET /api/v1/nodes`
pub async fn list_nodes(
    _auth: ApiSecret,
    State(state): State<AppState>,
) -> Result<Json<ListNodesResponse>, ApiError> {
    let nodes = state.meta.list_nodes().await.map_internal()?;
    let total = nodes.len();
    Ok(Json(ListNodesResponse { nodes, total }))
}

/// create a node.
///
/// `POST /api/v1/nodes`
pub async fn create_node(
    _auth: ApiSecret,
    State(state): State<AppState>,
    Json(req): Json<NodeCreate>,
) -> Result<(StatusCode, Json<Node>), ApiError> {
    if req.name.is_empty() || req.secret_key.is_empty() {
        return Err(ApiError::bad_request("name and secret_key are required"));
    }

    let node = req.into_node();
    state.meta.create_node(&node).await.map_internal()?;
    Ok((StatusCode::CREATED, Json(node)))
}

/// get a node.
///
/// `GET /api/v1/nodes/{id}`
pub async fn get_node(
    _auth: ApiSecret,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Node>, ApiError> {
    let node = state
        .meta
        .get_node(&id)
        .await
        .map_internal()?
        .or_not_found("node not found")?;
    Ok(Json(node))
}

/// delete a node; hosted services cascade.
///
/// `DELETE /api/v1/nodes/{id}`
pub async fn delete_node(
    _auth: ApiSecret,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .meta
        .get_node(&id)
        .await
        .map_internal()?
        .or_not_found("node not found")?;
    state.meta.delete_node(&id).await.map_internal()?;
    Ok(StatusCode::NO_CONTENT)
}
