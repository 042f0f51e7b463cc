use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use common::types::StorageInfo;
use serde::{Deserialize, Serialize};
use service::gdrive::{CodeExchange, DriveError, DriveState};
use service::storage::StorageAdapter;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::ApiError;
use crate::state::AppState;

#[derive(Serialize)]
pub struct AuthUrl {
    pub url: String,
    pub state: String,
}

#[derive(Serialize)]
pub struct DriveStatus {
    pub configured: bool,
    pub active: bool,
    pub state: Option<DriveState>,
    pub pending_write: bool,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

pub async fn status(State(state): State<AppState>) -> Json<DriveStatus> {
    let active = state.persistence.get_type() == service::storage::StorageKind::GDrive;
    let (drive_state, pending_write) = match &state.drive {
        Some(drive) => (Some(drive.state().await), drive.has_pending_write()),
        None => (None, false),
    };
    Json(DriveStatus { configured: state.drive.is_some(), active, state: drive_state, pending_write })
}

pub async fn auth_url(State(state): State<AppState>) -> Result<Json<AuthUrl>, ApiError> {
    let (_, oauth) = state.drive_parts()?;
    let nonce = Uuid::new_v4().to_string();
    let url = oauth.authorize_url(&nonce)?;
    Ok(Json(AuthUrl { url, state: nonce }))
}

/// Consent redirect target. Success swaps the facade to Drive; any failure leaves it on local.
pub async fn callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Result<Json<StorageInfo>, ApiError> {
    let (drive, oauth) = state.drive_parts()?;
    let result = match (query.error, query.code) {
        (Some(reason), _) => Err(DriveError::Auth(format!("consent denied: {reason}"))),
        (None, Some(code)) => drive.connect(&CodeExchange { client: oauth, code }).await,
        (None, None) => Err(DriveError::Auth("missing authorization code".into())),
    };

    let mut dashboard = state.dashboard.write().await;
    match result {
        Ok(file_id) => {
            let remote: Arc<dyn StorageAdapter> = Arc::new(drive.clone());
            state.persistence.set_adapter(remote).await;
            dashboard.reload().await;
            info!(%file_id, "switched to gdrive storage");
            Ok(Json(StorageInfo { kind: state.persistence.get_type().to_string() }))
        }
        Err(e) => {
            warn!(error = %e, "gdrive connect failed; staying on local storage");
            state.persistence.use_local().await;
            dashboard.reload().await;
            Err(e.into())
        }
    }
}

/// Flush buffered Drive writes, forget the token and switch back to local storage.
pub async fn disconnect(State(state): State<AppState>) -> Json<StorageInfo> {
    let mut dashboard = state.dashboard.write().await;
    if let Some(drive) = &state.drive {
        drive.disconnect().await;
    }
    state.persistence.use_local().await;
    dashboard.reload().await;
    Json(StorageInfo { kind: state.persistence.get_type().to_string() })
}
