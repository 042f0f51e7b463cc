use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::gdrive::{GDriveAdapter, TokenStore};
use crate::storage::{LocalAdapter, Persistence, PreferenceStore, StorageAdapter, StorageKind};

/// Decide which backend to start with, before any dashboard data is read.
///
/// A recorded preference always wins. Without one, a still-valid cached Drive token means
/// the previous session was on Drive; that inference is recorded so it only happens once.
pub async fn select_backend(preference: &PreferenceStore, tokens: &TokenStore, now: DateTime<Utc>) -> StorageKind {
    if let Some(kind) = preference.recorded().await {
        return kind;
    }
    if tokens.valid_at(now).await.is_some() {
        info!("no storage preference recorded; inferring gdrive from cached token");
        preference.record(StorageKind::GDrive).await;
        return StorageKind::GDrive;
    }
    StorageKind::Local
}

/// Build the facade for this process: restore Drive silently when it was selected,
/// otherwise (or when restore fails) start on local storage.
pub async fn activate(
    preference: PreferenceStore,
    tokens: &TokenStore,
    local: Arc<LocalAdapter>,
    drive: Option<&GDriveAdapter>,
    now: DateTime<Utc>,
) -> Persistence {
    let kind = select_backend(&preference, tokens, now).await;
    if kind == StorageKind::GDrive {
        match drive {
            Some(drive) => match drive.restore_session().await {
                Ok(file_id) => {
                    info!(%file_id, "starting on gdrive storage");
                    let remote: Arc<dyn StorageAdapter> = Arc::new(drive.clone());
                    return Persistence::new(remote, local, preference);
                }
                Err(e) => warn!(error = %e, "gdrive session not restorable; using local storage"),
            },
            None => warn!("gdrive preference recorded but drive sync is not configured"),
        }
        preference.record(StorageKind::Local).await;
    }
    info!("starting on local storage");
    Persistence::local(local, preference)
}
