use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use common::types::ErrorBody;
use service::errors::ServiceError;
use service::gdrive::DriveError;
use service::todoist::TodoistError;
use thiserror::Error;
use tracing::error;

/// JSON error response: `{ "error": ..., "detail": ... }`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub detail: Option<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, error: impl Into<String>, detail: Option<String>) -> Self {
        Self { status, error: error.into(), detail }
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "Bad Request", Some(detail.into()))
    }

    pub fn unauthorized(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Unauthorized", Some(detail.into()))
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "Not Found", Some(detail.into()))
    }

    pub fn bad_gateway(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, "Bad Gateway", Some(detail.into()))
    }

    pub fn unavailable(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, "Service Unavailable", Some(detail.into()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = %self.status, detail = ?self.detail, "request failed");
        }
        (self.status, Json(ErrorBody { error: self.error, detail: self.detail })).into_response()
    }
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::Validation(msg) => ApiError::new(StatusCode::BAD_REQUEST, "Validation Error", Some(msg)),
            ServiceError::Storage(msg) => ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Storage Error", Some(msg)),
        }
    }
}

impl From<TodoistError> for ApiError {
    fn from(e: TodoistError) -> Self {
        match e {
            TodoistError::Unauthorized => ApiError::unauthorized(e.to_string()),
            TodoistError::InvalidId(_) => ApiError::bad_request(e.to_string()),
            other => ApiError::bad_gateway(other.to_string()),
        }
    }
}

impl From<DriveError> for ApiError {
    fn from(e: DriveError) -> Self {
        match &e {
            DriveError::Auth(_) | DriveError::TokenExpired => ApiError::unauthorized(e.to_string()),
            DriveError::Http { status: 401 | 403, .. } => ApiError::unauthorized(e.to_string()),
            DriveError::NotConnected => ApiError::new(StatusCode::CONFLICT, "Conflict", Some(e.to_string())),
            _ => ApiError::bad_gateway(e.to_string()),
        }
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("runtime check failed: {0}")]
    Runtime(String),
}
