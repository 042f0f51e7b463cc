use std::sync::Arc;

use service::dashboard::Dashboard;
use service::gdrive::{GDriveAdapter, OAuthClient};
use service::storage::Persistence;
use service::todoist::TodoistClient;
use tokio::sync::RwLock;

use crate::errors::ApiError;

/// Shared handles for every request handler.
#[derive(Clone)]
pub struct AppState {
    pub persistence: Arc<Persistence>,
    /// Writers hold this lock across adapter swaps so a mutation never lands mid-reload.
    pub dashboard: Arc<RwLock<Dashboard>>,
    pub drive: Option<GDriveAdapter>,
    pub oauth: Option<Arc<OAuthClient>>,
    pub todoist: Arc<TodoistClient>,
}

impl AppState {
    /// Drive adapter and OAuth client, or 503 when no client id is configured.
    pub fn drive_parts(&self) -> Result<(&GDriveAdapter, &OAuthClient), ApiError> {
        match (&self.drive, &self.oauth) {
            (Some(drive), Some(oauth)) => Ok((drive, oauth.as_ref())),
            _ => Err(ApiError::unavailable("google drive sync is not configured")),
        }
    }
}
