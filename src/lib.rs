//! Taskbox
//!
//! A REST backend for personal task management with SQLite persistence,
//! plus the client-side query cache and reorder planner used by its UIs.

pub mod api;
pub mod client;
pub mod config;
pub mod db;
pub mod errors;
pub mod models;

use std::sync::Arc;

use axum::{
    routing::{delete, get, patch, post},
    Json, Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use db::Repository;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub config: Arc<Config>,
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Fixed paths are registered before /tasks/{id} so "reorder",
    // "bulk", and "completed" never match as task ids.
    let api_routes = Router::new()
        // Tasks
        .route("/tasks", get(api::list_tasks))
        .route("/tasks", post(api::create_task))
        .route("/tasks/reorder", patch(api::reorder_tasks))
        .route("/tasks/bulk", post(api::bulk_action))
        .route("/tasks/completed", delete(api::clear_completed))
        .route("/tasks/{id}", get(api::get_task))
        .route("/tasks/{id}", patch(api::update_task))
        .route("/tasks/{id}", delete(api::delete_task))
        .route("/tasks/{id}/toggle", patch(api::toggle_task))
        // Tags
        .route("/tags", get(api::list_tags))
        .route("/tags", post(api::create_tag))
        .route("/tags/{id}", get(api::get_tag))
        .route("/tags/{id}", patch(api::update_tag))
        .route("/tags/{id}", delete(api::delete_tag));

    Router::new()
        .route("/", get(service_info))
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Service info endpoint.
async fn service_info() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": "taskbox",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "health": "/health",
            "tasks": "/api/v1/tasks",
            "tags": "/api/v1/tags",
        },
    }))
}

/// Health check endpoint.
async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
