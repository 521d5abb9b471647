//! hue library - HTTP handlers, RPC services, and application setup.

pub mod cli;
pub mod handlers;
pub mod rpc;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use hue_db::{ActiveDb, MetaDb};
use hue_engine::UsageEngine;
use hue_state::MemoryState;
use hue_types::Config;

/// application state shared across handlers and RPC services.
#[derive(Clone)]
pub struct AppState {
    /// the usage enforcement engine.
    pub engine: Arc<UsageEngine>,
    /// the metadata store.
    pub meta: MetaDb,
    /// the active buffer store.
    pub active: Arc<ActiveDb>,
    /// shared in-memory state.
    pub state: Arc<MemoryState>,
    /// application configuration.
    pub config: Arc<Config>,
}

/// create the axum application with all REST routes.
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/api/v1/users",
            get(handlers::list_users).post(handlers::create_user),
        )
        .route(
            "/api/v1/users/{id}",
            get(handlers::get_user)
                .put(handlers::update_user)
                .delete(handlers::delete_user),
        )
        .route("/api/v1/users/{id}/package", get(handlers::get_user_package))
        .route("/api/v1/packages", post(handlers::create_package))
        .route("/api/v1/packages/{id}", get(handlers::get_package))
        .route(
            "/api/v1/nodes",
            get(handlers::list_nodes).post(handlers::create_node),
        )
        .route(
            "/api/v1/nodes/{id}",
            get(handlers::get_node).delete(handlers::delete_node),
        )
        .route("/api/v1/services", post(handlers::create_service))
        .route(
            "/api/v1/services/{id}",
            get(handlers::get_service).delete(handlers::delete_service),
        )
        .route("/api/v1/stats", get(handlers::get_stats))
        .with_state(state)
}
