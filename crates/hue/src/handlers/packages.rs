//! package endpoints for api v1.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use hue_types::{Package, PackageCreate};

use crate::AppState;
use crate::handlers::{ApiError, ApiSecret, OptionExt, ResultExt};

/// create a package and make it the owner's active package when they have
/// none.
///
/// `POST /api/v1/packages`
pub async fn create_package(
    _auth: ApiSecret,
    State(state): State<AppState>,
    Json(req): Json<PackageCreate>,
) -> Result<(StatusCode, Json<Package>), ApiError> {
    if req.duration <= 0 {
        return Err(ApiError::bad_request("duration must be positive"));
    }

    let mut owner = state
        .meta
        .get_user(&req.user_id)
        .await
        .map_internal()?
        .or_not_found("user not found")?;

    let pkg = req.into_package();
    state.meta.create_package(&pkg).await.map_internal()?;

    if owner.active_package_id.is_none() {
        owner.active_package_id = Some(pkg.id.clone());
        state.meta.update_user(&owner).await.map_internal()?;
        state
            .engine
            .quota()
            .refresh_cache(&owner.id)
            .await
            .map_internal()?;
    }

    Ok((StatusCode::CREATED, Json(pkg)))
}

/// get a package.
///
/// `GET /api/v1/packages/{id}`
pub async fn get_package(
    _auth: ApiSecret,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Package>, ApiError> {
    let pkg = state
        .meta
        .get_package(&id)
        .await
        .map_internal()?
        .or_not_found("package not found")?;
    Ok(Json(pkg))
}
