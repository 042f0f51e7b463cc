pub mod dashboard;
pub mod gdrive;
pub mod storage;
pub mod todoist;

use axum::{
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tower_http::{
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use common::types::Health;

use crate::state::AppState;

pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

async fn metrics() -> impl IntoResponse {
    common::observability::encode_metrics()
}

/// Build the full application router: static frontend, storage, dashboard and relays.
pub fn build_router(state: AppState, cors: CorsLayer, frontend_dir: &str) -> Router {
    let index = format!("{}/index.html", frontend_dir.trim_end_matches('/'));
    let static_dir = ServeDir::new(frontend_dir).fallback(ServeFile::new(index));

    let ops = Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics));

    let storage_routes = Router::new()
        .route("/api/storage", get(storage::storage_type))
        .route(
            "/api/storage/:key",
            get(storage::get_item).put(storage::put_item).delete(storage::delete_item),
        )
        .route("/api/state", get(dashboard::get_state))
        .route("/api/state/:key", get(dashboard::get_key).put(dashboard::put_key));

    let gdrive_routes = Router::new()
        .route("/api/gdrive/status", get(gdrive::status))
        .route("/api/gdrive/auth-url", get(gdrive::auth_url))
        .route("/api/gdrive/callback", get(gdrive::callback))
        .route("/api/gdrive/disconnect", post(gdrive::disconnect));

    let todoist_routes = Router::new()
        .route("/api/todoist/projects", get(todoist::list_projects))
        .route("/api/todoist/tasks", get(todoist::list_tasks).post(todoist::create_task))
        .route("/api/todoist/tasks/:id", axum::routing::delete(todoist::delete_task))
        .route("/api/todoist/tasks/:id/close", post(todoist::close_task))
        .route("/api/todoist/tasks/:id/reopen", post(todoist::reopen_task));

    ops.merge(storage_routes)
        .merge(gdrive_routes)
        .merge(todoist_routes)
        .fallback_service(static_dir)
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO).include_headers(false))
                // 5xx
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}
