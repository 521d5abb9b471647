//! shared fixture for REST integration tests.

// each test binary uses a different subset of these helpers
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response};
use http_body_util::BodyExt;
use tower::ServiceExt;

use hue::{AppState, create_app};
use hue_db::{ActiveDb, HistoryDb, MetaDb};
use hue_engine::{
    EventStore, PenaltyManager, QuotaEngine, ReceiverHub, SessionTracker, UsageEngine,
};
use hue_state::{LockRegistry, MemoryState};
use hue_types::{Config, EventStoreKind};

/// the configured admin secret used by every test app.
pub const TEST_SECRET: &str = "test-admin-secret";

/// build an application over fresh in-memory stores.
pub async fn test_app() -> (Router, AppState) {
    let meta = MetaDb::new_in_memory().await.expect("metadata store");
    let active = Arc::new(ActiveDb::new_in_memory().await.expect("active store"));
    let history = HistoryDb::new_in_memory().await.expect("history store");

    let state = Arc::new(MemoryState::new());
    let locks = Arc::new(LockRegistry::new());
    let quota = Arc::new(QuotaEngine::new(
        meta.clone(),
        Arc::clone(&state),
        Arc::clone(&locks),
    ));
    let session = Arc::new(SessionTracker::new(
        Arc::clone(&state),
        Duration::from_secs(300),
    ));
    let penalty = Arc::new(PenaltyManager::new(
        Arc::clone(&state),
        Duration::from_secs(600),
    ));
    let events = EventStore::new(EventStoreKind::Db, history.clone()).expect("event store");
    let hub = Arc::new(ReceiverHub::new());

    let engine = Arc::new(UsageEngine::new(
        quota,
        session,
        penalty,
        None,
        events,
        hub,
        Arc::clone(&state),
        meta.clone(),
        Arc::clone(&active),
        history,
    ));

    let config = Arc::new(Config {
        auth_secret: TEST_SECRET.to_string(),
        ..Default::default()
    });

    let app_state = AppState {
        engine,
        meta,
        active,
        state,
        config,
    };

    (create_app(app_state.clone()), app_state)
}

/// send a request with the admin secret header attached.
pub async fn authed(app: &Router, method: &str, uri: &str, body: Option<&str>) -> Response<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Hue-API-Key", TEST_SECRET);
    if body.is_some() {
        builder = builder.header("content-type", "application/json");
    }
    let request = builder
        .body(body.map(|b| Body::from(b.to_string())).unwrap_or_default())
        .expect("failed to build request");

    app.clone().oneshot(request).await.expect("request failed")
}

/// read a response body as json.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("failed to read body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body is not json")
}
