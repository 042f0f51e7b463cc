use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::Value;
use service::dashboard::{DashboardState, StateKey};

use crate::errors::ApiError;
use crate::state::AppState;

fn parse_key(key: &str) -> Result<StateKey, ApiError> {
    key.parse::<StateKey>().map_err(ApiError::not_found)
}

pub async fn get_state(State(state): State<AppState>) -> Json<DashboardState> {
    Json(state.dashboard.read().await.state().clone())
}

pub async fn get_key(State(state): State<AppState>, Path(key): Path<String>) -> Result<Json<Value>, ApiError> {
    let key = parse_key(&key)?;
    Ok(Json(state.dashboard.read().await.value_of(key)))
}

/// Replace one logical key; responds with the value as stored after normalization.
pub async fn put_key(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(value): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let key = parse_key(&key)?;
    let mut dashboard = state.dashboard.write().await;
    dashboard.replace(key, value).await?;
    Ok(Json(dashboard.value_of(key)))
}
