//! user endpoints for api v1.
//!
//! endpoints:
//! - `GET /api/v1/users` - list users with optional filters
//! - `POST /api/v1/users` - create a user
//! - `GET|PUT|DELETE /api/v1/users/{id}`
//! - `GET /api/v1/users/{id}/package` - the user's active package

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Serialize;

use hue_types::{Package, User, UserCreate, UserFilter, UserUpdate};

use crate::AppState;
use crate::handlers::{ApiError, ApiSecret, OptionExt, ResultExt};

/// response wrapper for the list endpoint.
#[derive(Debug, Serialize)]
pub struct ListUsersResponse {
    pub users: Vec<User>,
    pub total: usize,
}

/// list users.
///
/// `GET /api/v1/users?status=&search=&limit=&offset=`
pub async fn list_users(
    _auth: ApiSecret,
    State(state): State<AppState>,
    Query(mut filter): Query<UserFilter>,
) -> Result<Json<ListUsersResponse>, ApiError> {
    if filter.limit == 0 {
        filter.limit = 100;
    }
    let users = state.meta.list_users(&filter).await.map_internal()?;
    let total = users.len();
    Ok(Json(ListUsersResponse { users, total }))
}

/// create a user.
///
/// `POST /api/v1/users`
pub async fn create_user(
    _auth: ApiSecret,
    State(state): State<AppState>,
    Json(req): Json<UserCreate>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    if req.username.is_empty() || req.password.is_empty() {
        return Err(ApiError::bad_request("username and password are required"));
    }
    if state
        .meta
        .get_user_by_username(&req.username)
        .await
        .map_internal()?
        .is_some()
    {
        return Err(ApiError::bad_request(format!(
            "user '{}' already exists",
            req.username
        )));
    }

    let mut user = User::new(req.username, req.password);
    user.manager_id = req.manager_id;
    user.public_key = req.public_key;
    user.private_key = req.private_key;
    user.ca_cert_list = req.ca_cert_list;
    user.groups = req.groups;
    user.allowed_devices = req.allowed_devices;
    user.active_package_id = req.active_package_id;

    state.meta.create_user(&user).await.map_internal()?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// get a user.
///
/// `GET /api/v1/users/{id}`
pub async fn get_user(
    _auth: ApiSecret,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<User>, ApiError> {
    let user = state
        .meta
        .get_user(&id)
        .await
        .map_internal()?
        .or_not_found("user not found")?;
    Ok(Json(user))
}

/// update a user.
///
/// `PUT /api/v1/users/{id}`
pub async fn update_user(
    _auth: ApiSecret,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UserUpdate>,
) -> Result<Json<User>, ApiError> {
    let mut user = state
        .meta
        .get_user(&id)
        .await
        .map_internal()?
        .or_not_found("user not found")?;

    if let Some(username) = req.username {
        user.username = username;
    }
    if let Some(manager_id) = req.manager_id {
        user.manager_id = Some(manager_id);
    }
    if let Some(password) = req.password {
        user.password = password;
    }
    if let Some(public_key) = req.public_key {
        user.public_key = public_key;
    }
    if let Some(private_key) = req.private_key {
        user.private_key = private_key;
    }
    if let Some(ca_cert_list) = req.ca_cert_list {
        user.ca_cert_list = ca_cert_list;
    }
    if let Some(groups) = req.groups {
        user.groups = groups;
    }
    if let Some(allowed_devices) = req.allowed_devices {
        user.allowed_devices = allowed_devices;
    }
    if let Some(status) = req.status {
        user.status = status;
    }
    if let Some(active_package_id) = req.active_package_id {
        user.active_package_id = Some(active_package_id);
    }

    state.meta.update_user(&user).await.map_internal()?;

    // the cached view is now stale
    state
        .engine
        .quota()
        .refresh_cache(&id)
        .await
        .map_internal()?;

    Ok(Json(user))
}

/// delete a user and its cached state.
///
/// `DELETE /api/v1/users/{id}`
pub async fn delete_user(
    _auth: ApiSecret,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .meta
        .get_user(&id)
        .await
        .map_internal()?
        .or_not_found("user not found")?;

    state.meta.delete_user(&id).await.map_internal()?;
    state.state.delete_user(&id);
    Ok(StatusCode::NO_CONTENT)
}

/// get the user's active package.
///
/// `GET /api/v1/users/{id}/package`
pub async fn get_user_package(
    _auth: ApiSecret,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Package>, ApiError> {
    let pkg = state
        .meta
        .get_package_by_user_id(&id)
        .await
        .map_internal()?
        .or_not_found("no active package")?;
    Ok(Json(pkg))
}
