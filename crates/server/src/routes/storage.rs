use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use common::types::StorageInfo;
use serde_json::Value;
use service::dashboard::StateKey;

use crate::errors::ApiError;
use crate::state::AppState;

/// Which backend is active: `{ "type": "local" | "gdrive" }`.
pub async fn storage_type(State(state): State<AppState>) -> Json<StorageInfo> {
    Json(StorageInfo { kind: state.persistence.get_type().to_string() })
}

pub async fn get_item(State(state): State<AppState>, Path(key): Path<String>) -> Result<Json<Value>, ApiError> {
    state
        .persistence
        .get(&key)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("no value stored under `{key}`")))
}

/// Raw write. Dashboard keys are reloaded afterwards so `/api/state` stays in step.
pub async fn put_item(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(value): Json<Value>,
) -> StatusCode {
    let mut dashboard = state.dashboard.write().await;
    state.persistence.set(&key, value).await;
    if key.parse::<StateKey>().is_ok() {
        dashboard.reload().await;
    }
    StatusCode::NO_CONTENT
}

pub async fn delete_item(State(state): State<AppState>, Path(key): Path<String>) -> StatusCode {
    let mut dashboard = state.dashboard.write().await;
    state.persistence.remove(&key).await;
    if key.parse::<StateKey>().is_ok() {
        dashboard.reload().await;
    }
    StatusCode::NO_CONTENT
}
