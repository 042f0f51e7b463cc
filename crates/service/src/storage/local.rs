use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use super::adapter::{StorageAdapter, StorageError, StorageKind, StorageResult};
use super::json_map_store::JsonMapStore;

/// String-to-string store standing in for browser local storage.
pub type LocalKv = JsonMapStore<String, String>;

/// Adapter that keeps each logical key as a JSON string under `<namespace>:<key>`.
#[derive(Clone)]
pub struct LocalAdapter {
    kv: Arc<LocalKv>,
    namespace: String,
}

impl LocalAdapter {
    pub fn new(kv: Arc<LocalKv>, namespace: impl Into<String>) -> Self {
        Self { kv, namespace: namespace.into() }
    }

    fn namespaced(&self, key: &str) -> String {
        format!("{}:{}", self.namespace, key)
    }
}

#[async_trait]
impl StorageAdapter for LocalAdapter {
    fn kind(&self) -> StorageKind {
        StorageKind::Local
    }

    async fn get_item(&self, key: &str) -> StorageResult<Value> {
        let raw = self.kv.get(&self.namespaced(key)).await.ok_or(StorageError::NotFound)?;
        serde_json::from_str(&raw).map_err(|e| {
            warn!(%key, error = %e, "local value is not valid JSON; treating as absent");
            StorageError::NotFound
        })
    }

    async fn set_item(&self, key: &str, value: Value) -> StorageResult<()> {
        let raw = serde_json::to_string(&value).map_err(|e| StorageError::Transient(e.to_string()))?;
        self.kv
            .insert(self.namespaced(key), raw)
            .await
            .map_err(|e| StorageError::Transient(e.to_string()))
    }

    async fn remove_item(&self, key: &str) -> StorageResult<()> {
        self.kv
            .remove(&self.namespaced(key))
            .await
            .map(|_| ())
            .map_err(|e| StorageError::Transient(e.to_string()))
    }
}
