use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Identity of a storage backend. Persisted as a plain string flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    Local,
    GDrive,
}

impl StorageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StorageKind::Local => "local",
            StorageKind::GDrive => "gdrive",
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "local" => Ok(StorageKind::Local),
            "gdrive" => Ok(StorageKind::GDrive),
            other => Err(format!("unknown storage type `{other}`")),
        }
    }
}

/// Outcome classes an adapter reports; the facade decides what each one means for callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("key not found")]
    NotFound,
    #[error("transient storage failure: {0}")]
    Transient(String),
    #[error("fatal storage failure: {0}")]
    Fatal(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// A persistence backend the facade can delegate to.
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    fn kind(&self) -> StorageKind;

    async fn get_item(&self, key: &str) -> StorageResult<Value>;

    async fn set_item(&self, key: &str, value: Value) -> StorageResult<()>;

    async fn remove_item(&self, key: &str) -> StorageResult<()>;

    /// Push out any buffered writes. Backends without buffering have nothing to do.
    async fn flush(&self) -> StorageResult<()> {
        Ok(())
    }
}
