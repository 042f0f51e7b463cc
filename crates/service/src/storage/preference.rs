use std::sync::Arc;

use tracing::warn;

use super::adapter::StorageKind;
use super::local::LocalKv;

/// Local key under which the active backend's identity is recorded.
pub const STORAGE_TYPE_KEY: &str = "storage_type";

/// Remembers which backend was active so the next start can pick it before loading data.
#[derive(Clone)]
pub struct PreferenceStore {
    kv: Arc<LocalKv>,
}

impl PreferenceStore {
    pub fn new(kv: Arc<LocalKv>) -> Self {
        Self { kv }
    }

    /// The recorded backend, if any. Unknown flags are ignored.
    pub async fn recorded(&self) -> Option<StorageKind> {
        let raw = self.kv.get(&STORAGE_TYPE_KEY.to_string()).await?;
        match raw.parse() {
            Ok(kind) => Some(kind),
            Err(e) => {
                warn!(flag = %raw, error = %e, "ignoring unrecognised storage preference");
                None
            }
        }
    }

    pub async fn record(&self, kind: StorageKind) {
        if let Err(e) = self.kv.insert(STORAGE_TYPE_KEY.to_string(), kind.as_str().to_string()).await {
            warn!(%kind, error = %e, "failed to record storage preference");
        }
    }
}
