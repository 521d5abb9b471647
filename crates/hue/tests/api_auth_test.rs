//! integration tests for REST authentication.
//!
//! the secret arrives as the `secret` query parameter or the `Hue-API-Key`
//! header and must match the configured secret or a stored owner key.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use common::{TEST_SECRET, test_app};

#[tokio::test]
async fn missing_secret_is_unauthorized() {
    let (app, _state) = test_app().await;

    let request = Request::builder()
        .method("GET")
        .uri("/api/v1/users")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn configured_secret_via_header_is_accepted() {
    let (app, _state) = test_app().await;

    let request = Request::builder()
        .method("GET")
        .uri("/api/v1/users")
        .header("Hue-API-Key", TEST_SECRET)
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn configured_secret_via_query_is_accepted() {
    let (app, _state) = test_app().await;

    let request = Request::builder()
        .method("GET")
        .uri(format!("/api/v1/users?secret={TEST_SECRET}"))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn stored_owner_key_is_accepted() {
    let (app, state) = test_app().await;
    state
        .meta
        .upsert_owner_auth_key("db-owner-key")
        .await
        .unwrap();

    let ok = Request::builder()
        .method("GET")
        .uri("/api/v1/users")
        .header("Hue-API-Key", "db-owner-key")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(ok).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let wrong = Request::builder()
        .method("GET")
        .uri("/api/v1/users")
        .header("Hue-API-Key", "wrong-owner-key")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(wrong).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn revoked_owner_key_is_rejected() {
    let (app, state) = test_app().await;
    state
        .meta
        .upsert_owner_auth_key("db-owner-key")
        .await
        .unwrap();
    state.meta.revoke_owner_auth_key().await.unwrap();

    let request = Request::builder()
        .method("GET")
        .uri("/api/v1/users")
        .header("Hue-API-Key", "db-owner-key")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
