use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use common::observability::STORAGE_FALLBACK_TOTAL;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use super::adapter::{StorageAdapter, StorageError, StorageKind};
use super::local::LocalAdapter;
use super::preference::PreferenceStore;

/// Single entry point for all persistence.
///
/// Holds exactly one active adapter behind an [`ArcSwap`] so it can be replaced while
/// reads and writes are in flight. Callers never see an error: absent and failed reads
/// both come back as `None`, failed writes are logged and dropped. A fatal failure from
/// a remote adapter swaps the local adapter in and records that choice.
pub struct Persistence {
    active: ArcSwap<Arc<dyn StorageAdapter>>,
    fallback: Arc<LocalAdapter>,
    preference: PreferenceStore,
}

impl Persistence {
    /// Build a facade with `initial` active. Does not touch the recorded preference.
    pub fn new(initial: Arc<dyn StorageAdapter>, fallback: Arc<LocalAdapter>, preference: PreferenceStore) -> Self {
        Self { active: ArcSwap::from_pointee(initial), fallback, preference }
    }

    /// Facade backed by local storage only.
    pub fn local(local: Arc<LocalAdapter>, preference: PreferenceStore) -> Self {
        let initial: Arc<dyn StorageAdapter> = local.clone();
        Self::new(initial, local, preference)
    }

    fn current(&self) -> Arc<dyn StorageAdapter> {
        let guard = self.active.load();
        Arc::clone(&**guard)
    }

    pub fn get_type(&self) -> StorageKind {
        self.current().kind()
    }

    /// Hot-swap the backend. Nothing is copied between backends.
    pub async fn set_adapter(&self, adapter: Arc<dyn StorageAdapter>) {
        let kind = adapter.kind();
        let previous = self.current().kind();
        self.active.store(Arc::new(adapter));
        self.preference.record(kind).await;
        info!(from = %previous, to = %kind, "storage adapter switched");
    }

    /// Switch back to the local adapter.
    pub async fn use_local(&self) {
        let local: Arc<dyn StorageAdapter> = self.fallback.clone();
        self.set_adapter(local).await;
    }

    pub async fn get(&self, key: &str) -> Option<Value> {
        let adapter = self.current();
        match adapter.get_item(key).await {
            Ok(value) => Some(value),
            Err(e) => {
                self.handle_failure(&adapter, "get", key, e).await;
                None
            }
        }
    }

    /// Read several keys in one pass; every requested key is present in the result.
    pub async fn get_many(&self, keys: &[&str]) -> HashMap<String, Option<Value>> {
        let mut out = HashMap::with_capacity(keys.len());
        for key in keys {
            out.insert((*key).to_string(), self.get(key).await);
        }
        out
    }

    pub async fn set(&self, key: &str, value: Value) {
        let adapter = self.current();
        if let Err(e) = adapter.set_item(key, value).await {
            self.handle_failure(&adapter, "set", key, e).await;
        }
    }

    pub async fn remove(&self, key: &str) {
        let adapter = self.current();
        if let Err(e) = adapter.remove_item(key).await {
            self.handle_failure(&adapter, "remove", key, e).await;
        }
    }

    /// Flush buffered writes of the active adapter, e.g. on shutdown.
    pub async fn flush(&self) {
        let adapter = self.current();
        if let Err(e) = adapter.flush().await {
            error!(kind = %adapter.kind(), error = %e, "flush failed; buffered writes dropped");
        }
    }

    async fn handle_failure(&self, adapter: &Arc<dyn StorageAdapter>, op: &'static str, key: &str, err: StorageError) {
        let kind = adapter.kind();
        match err {
            StorageError::NotFound => debug!(%kind, op, %key, "key not found"),
            StorageError::Transient(msg) => warn!(%kind, op, %key, error = %msg, "storage operation failed; continuing"),
            StorageError::Fatal(msg) => {
                error!(%kind, op, %key, error = %msg, "storage backend unusable");
                // Only swap if the failing adapter is still the active one.
                if kind != StorageKind::Local && Arc::ptr_eq(&self.current(), adapter) {
                    STORAGE_FALLBACK_TOTAL.inc();
                    warn!(from = %kind, "falling back to local storage");
                    self.use_local().await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::local::LocalKv;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// In-memory adapter whose failures can be scripted.
    struct ScriptedAdapter {
        kind: StorageKind,
        items: Mutex<HashMap<String, Value>>,
        fail_with: Mutex<Option<StorageError>>,
    }

    impl ScriptedAdapter {
        fn new(kind: StorageKind) -> Arc<Self> {
            Arc::new(Self { kind, items: Mutex::new(HashMap::new()), fail_with: Mutex::new(None) })
        }

        fn fail(&self, err: StorageError) {
            *self.fail_with.lock().unwrap() = Some(err);
        }

        fn check(&self) -> Result<(), StorageError> {
            match self.fail_with.lock().unwrap().clone() {
                Some(e) => Err(e),
                None => Ok(()),
            }
        }
    }

    #[async_trait]
    impl StorageAdapter for ScriptedAdapter {
        fn kind(&self) -> StorageKind { self.kind }

        async fn get_item(&self, key: &str) -> Result<Value, StorageError> {
            self.check()?;
            self.items.lock().unwrap().get(key).cloned().ok_or(StorageError::NotFound)
        }

        async fn set_item(&self, key: &str, value: Value) -> Result<(), StorageError> {
            self.check()?;
            self.items.lock().unwrap().insert(key.to_string(), value);
            Ok(())
        }

        async fn remove_item(&self, key: &str) -> Result<(), StorageError> {
            self.check()?;
            self.items.lock().unwrap().remove(key);
            Ok(())
        }
    }

    async fn local_parts() -> anyhow::Result<(Arc<LocalAdapter>, PreferenceStore, std::path::PathBuf)> {
        let tmp = std::env::temp_dir().join(format!("facade_{}.json", uuid::Uuid::new_v4()));
        let kv = LocalKv::new(&tmp).await?;
        Ok((Arc::new(LocalAdapter::new(kv.clone(), "focusdash")), PreferenceStore::new(kv), tmp))
    }

    #[tokio::test]
    async fn set_then_get_round_trips_through_active_adapter() -> anyhow::Result<()> {
        let (local, prefs, tmp) = local_parts().await?;
        let facade = Persistence::local(local, prefs);
        assert_eq!(facade.get_type(), StorageKind::Local);

        let settings = json!({"opacity": 0.7, "clockFormat": "24h"});
        facade.set("settings", settings.clone()).await;
        assert_eq!(facade.get("settings").await, Some(settings));
        assert_eq!(facade.get("missing").await, None);

        facade.remove("settings").await;
        assert_eq!(facade.get("settings").await, None);
        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test]
    async fn swapping_adapters_never_merges_backends() -> anyhow::Result<()> {
        let (local, prefs, tmp) = local_parts().await?;
        let facade = Persistence::local(local, prefs.clone());
        facade.set("notes", json!("local notes")).await;

        let remote = ScriptedAdapter::new(StorageKind::GDrive);
        remote.items.lock().unwrap().insert("widgets".into(), json!({"todo": true}));
        facade.set_adapter(remote.clone()).await;

        assert_eq!(facade.get_type(), StorageKind::GDrive);
        assert_eq!(prefs.recorded().await, Some(StorageKind::GDrive));
        assert_eq!(facade.get("notes").await, None);
        assert_eq!(facade.get("widgets").await, Some(json!({"todo": true})));

        facade.use_local().await;
        assert_eq!(facade.get("notes").await, Some(json!("local notes")));
        assert_eq!(facade.get("widgets").await, None);
        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test]
    async fn transient_failure_reads_as_none_and_keeps_adapter() -> anyhow::Result<()> {
        let (local, prefs, tmp) = local_parts().await?;
        let facade = Persistence::local(local, prefs);
        let remote = ScriptedAdapter::new(StorageKind::GDrive);
        facade.set_adapter(remote.clone()).await;

        remote.fail(StorageError::Transient("503".into()));
        assert_eq!(facade.get("settings").await, None);
        facade.set("settings", json!({})).await;
        assert_eq!(facade.get_type(), StorageKind::GDrive);
        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test]
    async fn fatal_remote_failure_falls_back_to_local() -> anyhow::Result<()> {
        let (local, prefs, tmp) = local_parts().await?;
        let facade = Persistence::local(local, prefs.clone());
        let remote = ScriptedAdapter::new(StorageKind::GDrive);
        facade.set_adapter(remote.clone()).await;

        remote.fail(StorageError::Fatal("token expired".into()));
        facade.set("settings", json!({"opacity": 1.0})).await;

        assert_eq!(facade.get_type(), StorageKind::Local);
        assert_eq!(prefs.recorded().await, Some(StorageKind::Local));
        // The failed write is dropped, not replayed against the fallback.
        assert_eq!(facade.get("settings").await, None);
        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test]
    async fn get_many_reports_every_key() -> anyhow::Result<()> {
        let (local, prefs, tmp) = local_parts().await?;
        let facade = Persistence::local(local, prefs);
        facade.set("a", json!(1)).await;
        let got = facade.get_many(&["a", "b"]).await;
        assert_eq!(got.len(), 2);
        assert_eq!(got["a"], Some(json!(1)));
        assert_eq!(got["b"], None);
        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }
}
