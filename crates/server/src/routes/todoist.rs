use axum::{
    async_trait,
    extract::{FromRequestParts, Path, Query, State},
    http::{request::Parts, StatusCode},
    Json,
};
use serde::Deserialize;
use service::todoist::{NewTask, Project, Task};

use crate::errors::ApiError;
use crate::state::AppState;

pub const TOKEN_HEADER: &str = "x-todoist-token";

/// Api token supplied by the browser on every relayed call.
pub struct TodoistToken(pub String);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for TodoistToken {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(|t| TodoistToken(t.to_string()))
            .ok_or_else(|| ApiError::unauthorized("missing X-Todoist-Token header"))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskQuery {
    #[serde(default)]
    pub project_id: Option<String>,
}

pub async fn list_projects(
    State(state): State<AppState>,
    TodoistToken(token): TodoistToken,
) -> Result<Json<Vec<Project>>, ApiError> {
    Ok(Json(state.todoist.list_projects(&token).await?))
}

pub async fn list_tasks(
    State(state): State<AppState>,
    TodoistToken(token): TodoistToken,
    Query(query): Query<TaskQuery>,
) -> Result<Json<Vec<Task>>, ApiError> {
    let project = query.project_id.as_deref().filter(|p| !p.is_empty());
    Ok(Json(state.todoist.list_tasks(&token, project).await?))
}

pub async fn create_task(
    State(state): State<AppState>,
    TodoistToken(token): TodoistToken,
    Json(task): Json<NewTask>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    if task.text.trim().is_empty() {
        return Err(ApiError::bad_request("task text is empty"));
    }
    let created = state.todoist.create_task(&token, &task).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn close_task(
    State(state): State<AppState>,
    TodoistToken(token): TodoistToken,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.todoist.close_task(&token, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn reopen_task(
    State(state): State<AppState>,
    TodoistToken(token): TodoistToken,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.todoist.reopen_task(&token, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_task(
    State(state): State<AppState>,
    TodoistToken(token): TodoistToken,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.todoist.delete_task(&token, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
