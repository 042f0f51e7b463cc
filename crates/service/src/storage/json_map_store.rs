use std::{collections::HashMap, hash::Hash, path::PathBuf, sync::Arc};
use tokio::{fs, sync::RwLock};
use tracing::{debug, warn};

use crate::errors::ServiceError;

/// Generic JSON file-backed key-value map store.
///
/// Keeps a `HashMap<K, V>` in memory and rewrites the whole JSON file on every mutation.
/// The file is written to a sibling temp path and renamed into place so a crash mid-write
/// leaves the previous contents intact.
#[derive(Clone)]
pub struct JsonMapStore<K, V> {
    inner: Arc<RwLock<HashMap<K, V>>>,
    file_path: PathBuf,
}

impl<K, V> JsonMapStore<K, V>
where
    K: Eq + Hash + serde::Serialize + serde::de::DeserializeOwned + Clone,
    V: serde::Serialize + serde::de::DeserializeOwned + Clone,
{
    /// Open the store at `path`. Creates the file with an empty map if missing; a corrupt
    /// file is logged and treated as empty.
    pub async fn new<P: Into<PathBuf>>(path: P) -> Result<Arc<Self>, ServiceError> {
        let file_path = path.into();
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).await.ok();
        }

        let map: HashMap<K, V> = match fs::read(&file_path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                warn!(path = %file_path.display(), error = %e, "store file is not a JSON map; starting empty");
                HashMap::new()
            }),
            Err(_) => {
                let empty: HashMap<K, V> = HashMap::new();
                fs::write(&file_path, serde_json::to_vec(&empty).map_err(|e| ServiceError::Storage(e.to_string()))?)
                    .await
                    .map_err(|e| ServiceError::Storage(e.to_string()))?;
                empty
            }
        };

        Ok(Arc::new(Self { inner: Arc::new(RwLock::new(map)), file_path }))
    }

    async fn save(&self, map: &HashMap<K, V>) -> Result<(), ServiceError> {
        let data = serde_json::to_vec(map).map_err(|e| ServiceError::Storage(e.to_string()))?;
        let tmp = self.file_path.with_extension("json.tmp");
        fs::write(&tmp, data).await.map_err(|e| ServiceError::Storage(e.to_string()))?;
        fs::rename(&tmp, &self.file_path).await.map_err(|e| ServiceError::Storage(e.to_string()))?;
        debug!(path = %self.file_path.display(), entries = map.len(), "store persisted");
        Ok(())
    }

    /// Get value by key.
    pub async fn get(&self, key: &K) -> Option<V> {
        let map = self.inner.read().await;
        map.get(key).cloned()
    }

    /// Insert or update a value by key and persist.
    pub async fn insert(&self, key: K, value: V) -> Result<(), ServiceError> {
        let mut map = self.inner.write().await;
        map.insert(key, value);
        self.save(&map).await
    }

    /// Remove a key and persist; returns whether it existed.
    pub async fn remove(&self, key: &K) -> Result<bool, ServiceError> {
        let mut map = self.inner.write().await;
        let existed = map.remove(key).is_some();
        if existed {
            self.save(&map).await?;
        }
        Ok(existed)
    }

    /// Apply a mutation to the underlying map and persist once.
    pub async fn update_map<F>(&self, f: F) -> Result<(), ServiceError>
    where
        F: FnOnce(&mut HashMap<K, V>) -> Result<(), ServiceError>,
    {
        let mut map = self.inner.write().await;
        f(&mut map)?;
        self.save(&map).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn json_map_store_crud_persists() -> Result<(), anyhow::Error> {
        let tmp = std::env::temp_dir().join(format!("json_map_store_{}.json", uuid::Uuid::new_v4()));
        let store = JsonMapStore::<String, String>::new(&tmp).await?;

        assert_eq!(store.get(&"storage_type".into()).await, None);

        store.insert("focusdash:settings".into(), r#"{"opacity":0.5}"#.into()).await?;
        store.insert("storage_type".into(), "local".into()).await?;
        assert_eq!(store.get(&"storage_type".into()).await.as_deref(), Some("local"));

        store
            .update_map(|m| {
                m.insert("gdrive_access_token".into(), "tok".into());
                m.insert("gdrive_token_expiry".into(), "1700000000000".into());
                Ok(())
            })
            .await?;

        let existed = store.remove(&"storage_type".into()).await?;
        assert!(existed);
        assert!(!store.remove(&"storage_type".into()).await?);

        let reloaded = JsonMapStore::<String, String>::new(&tmp).await?;
        assert_eq!(reloaded.get(&"storage_type".into()).await, None);
        assert_eq!(reloaded.get(&"gdrive_access_token".into()).await.as_deref(), Some("tok"));
        assert_eq!(reloaded.get(&"focusdash:settings".into()).await.as_deref(), Some(r#"{"opacity":0.5}"#));

        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test]
    async fn corrupt_file_opens_empty() -> Result<(), anyhow::Error> {
        let tmp = std::env::temp_dir().join(format!("json_map_store_bad_{}.json", uuid::Uuid::new_v4()));
        tokio::fs::write(&tmp, b"not json").await?;
        let store = JsonMapStore::<String, String>::new(&tmp).await?;
        assert_eq!(store.get(&"focusdash:settings".into()).await, None);
        store.insert("focusdash:settings".into(), "{}".into()).await?;
        let reopened = JsonMapStore::<String, String>::new(&tmp).await?;
        assert_eq!(reopened.get(&"focusdash:settings".into()).await.as_deref(), Some("{}"));
        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }
}
