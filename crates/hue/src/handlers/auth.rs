//! shared-secret authentication for REST endpoints
//!
//! the secret arrives either as the `secret` query parameter or the
//! `Hue-API-Key` header. It must match the configured admin secret or a
//! stored, unrevoked owner key (hex SHA-256, compared in constant time).

use axum::{
    extract::{FromRequestParts, Query},
    http::request::Parts,
};
use serde::Deserialize;
use subtle::ConstantTimeEq;

use crate::AppState;
use crate::handlers::ApiError;

/// header carrying the api secret.
const API_KEY_HEADER: &str = "Hue-API-Key";

/// marker extractor proving the request presented a valid secret.
#[derive(Debug, Clone, Copy)]
pub struct ApiSecret;

#[derive(Deserialize)]
struct SecretQuery {
    #[serde(default)]
    secret: Option<String>,
}

fn extract_secret(parts: &Parts) -> Option<String> {
    if let Ok(Query(query)) = Query::<SecretQuery>::try_from_uri(&parts.uri)
        && let Some(secret) = query.secret.filter(|s| !s.is_empty())
    {
        return Some(secret);
    }
    parts
        .headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

impl FromRequestParts<AppState> for ApiSecret {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(presented) = extract_secret(parts) else {
            return Err(ApiError::unauthorized("unauthorized"));
        };

        // configured admin secret, compared in constant time
        let configured = state.config.auth_secret.as_bytes();
        if !configured.is_empty()
            && bool::from(presented.as_bytes().ct_eq(configured))
        {
            return Ok(ApiSecret);
        }

        // any stored active owner key
        let valid = state
            .meta
            .validate_owner_auth_key(&presented)
            .await
            .map_err(|_| ApiError::internal("auth validation failed"))?;
        if valid {
            return Ok(ApiSecret);
        }

        Err(ApiError::unauthorized("unauthorized"))
    }
}
