//! service endpoints for api v1.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use hue_types::{Service, ServiceCreate};

use crate::AppState;
use crate::handlers::{ApiError, ApiSecret, OptionExt, ResultExt};

/// create a service on a node.
///
/// `POST /api/v1/services`
pub async fn create_service(
    _auth: ApiSecret,
    State(state): State<AppState>,
    Json(req): Json<ServiceCreate>,
) -> Result<(StatusCode, Json<Service>), ApiError> {
    if req.name.is_empty() || req.secret_key.is_empty() || req.protocol.is_empty() {
        return Err(ApiError::bad_request(
            "name, secret_key and protocol are required",
        ));
    }
    state
        .meta
        .get_node(&req.node_id)
        .await
        .map_internal()?
        .or_not_found("node not found")?;

    let service = req.into_service();
    state.meta.create_service(&service).await.map_internal()?;
    Ok((StatusCode::CREATED, Json(service)))
}

/// get a service.
///
/// `GET /api/v1/services/{id}`
pub async fn get_service(
    _auth: ApiSecret,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Service>, ApiError> {
    let service = state
        .meta
        .get_service(&id)
        .await
        .map_internal()?
        .or_not_found("service not found")?;
    Ok(Json(service))
}

/// delete a service.
///
/// `DELETE /api/v1/services/{id}`
pub async fn delete_service(
    _auth: ApiSecret,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .meta
        .get_service(&id)
        .await
        .map_internal()?
        .or_not_found("service not found")?;
    state.meta.delete_service(&id).await.map_internal()?;
    Ok(StatusCode::NO_CONTENT)
}
