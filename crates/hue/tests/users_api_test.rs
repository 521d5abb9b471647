//! integration tests for the user and package endpoints.

mod common;

use axum::http::StatusCode;

use common::{authed, body_json, test_app};

#[tokio::test]
async fn user_crud_round_trip() {
    let (app, _state) = test_app().await;

    // create
    let response = authed(
        &app,
        "POST",
        "/api/v1/users",
        Some(r#"{"username": "alice", "password": "s3cret", "groups": ["premium"]}"#),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["username"], "alice");
    assert_eq!(created["status"], "active");
    // credentials never serialize outward
    assert!(created.get("password").is_none());

    // fetch: semantic fields survive the round trip
    let response = authed(&app, "GET", &format!("/api/v1/users/{id}"), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let fetched = body_json(response).await;
    assert_eq!(fetched["username"], "alice");
    assert_eq!(fetched["groups"], serde_json::json!(["premium"]));
    // timestamps survive the round trip at second resolution
    assert_eq!(
        &fetched["created_at"].as_str().unwrap()[..19],
        &created["created_at"].as_str().unwrap()[..19]
    );

    // update
    let response = authed(
        &app,
        "PUT",
        &format!("/api/v1/users/{id}"),
        Some(r#"{"status": "inactive"}"#),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated = body_json(response).await;
    assert_eq!(updated["status"], "inactive");

    // list
    let response = authed(&app, "GET", "/api/v1/users", None).await;
    let listed = body_json(response).await;
    assert_eq!(listed["total"], 1);

    // delete
    let response = authed(&app, "DELETE", &format!("/api/v1/users/{id}"), None).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let response = authed(&app, "GET", &format!("/api/v1/users/{id}"), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn duplicate_username_rejected() {
    let (app, _state) = test_app().await;

    let body = r#"{"username": "bob", "password": "x"}"#;
    let response = authed(&app, "POST", "/api/v1/users", Some(body)).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = authed(&app, "POST", "/api/v1/users", Some(body)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn package_creation_becomes_active_package() {
    let (app, _state) = test_app().await;

    let response = authed(
        &app,
        "POST",
        "/api/v1/users",
        Some(r#"{"username": "carol", "password": "x"}"#),
    )
    .await;
    let user = body_json(response).await;
    let user_id = user["id"].as_str().unwrap().to_string();

    let pkg_body = format!(
        r#"{{"user_id": "{user_id}", "total_traffic": 1000, "reset_mode": "no-reset", "duration": 3600, "max_concurrent": 2}}"#
    );
    let response = authed(&app, "POST", "/api/v1/packages", Some(&pkg_body)).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let pkg = body_json(response).await;
    assert_eq!(pkg["total_traffic"], 1000);
    assert_eq!(pkg["max_concurrent"], 2);

    // the user now reports it as the active package
    let response = authed(&app, "GET", &format!("/api/v1/users/{user_id}/package"), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let active = body_json(response).await;
    assert_eq!(active["id"], pkg["id"]);

    // and it is fetchable directly
    let pkg_id = pkg["id"].as_str().unwrap();
    let response = authed(&app, "GET", &format!("/api/v1/packages/{pkg_id}"), None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn package_for_unknown_user_is_not_found() {
    let (app, _state) = test_app().await;

    let response = authed(
        &app,
        "POST",
        "/api/v1/packages",
        Some(r#"{"user_id": "ghost", "total_traffic": 1, "reset_mode": "no-reset", "duration": 60, "max_concurrent": 1}"#),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn stats_reflect_created_entities() {
    let (app, _state) = test_app().await;

    authed(
        &app,
        "POST",
        "/api/v1/users",
        Some(r#"{"username": "dave", "password": "x"}"#),
    )
    .await;
    let response = authed(
        &app,
        "POST",
        "/api/v1/nodes",
        Some(r#"{"name": "edge-1", "secret_key": "node-secret"}"#),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = authed(&app, "GET", "/api/v1/stats", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let stats = body_json(response).await;
    assert_eq!(stats["users"], 1);
    assert_eq!(stats["nodes"], 1);
    assert_eq!(stats["services"], 0);
}
