use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use super::error::DriveError;

/// Metadata of a file in the user's Drive.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DriveFile {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// The four Drive operations the adapter relies on.
#[async_trait]
pub trait DriveApi: Send + Sync {
    /// Non-trashed files with exactly this name, in the order Drive returns them.
    async fn list_by_name(&self, token: &str, name: &str) -> Result<Vec<DriveFile>, DriveError>;

    async fn get_content(&self, token: &str, file_id: &str) -> Result<String, DriveError>;

    async fn create(&self, token: &str, name: &str, content: &str) -> Result<DriveFile, DriveError>;

    async fn update_content(&self, token: &str, file_id: &str, content: &str) -> Result<(), DriveError>;
}

/// Produces the Drive client. Called at most once per adapter.
#[async_trait]
pub trait DriveClientLoader: Send + Sync {
    async fn load(&self) -> Result<Arc<dyn DriveApi>, DriveError>;
}

/// In-memory Drive for tests
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct InMemoryDrive {
        files: Mutex<Vec<(DriveFile, String)>>,
        fail_with: Mutex<Option<DriveError>>,
        pub list_calls: AtomicUsize,
        pub create_calls: AtomicUsize,
        pub update_calls: AtomicUsize,
        pub get_calls: AtomicUsize,
    }

    impl InMemoryDrive {
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        /// Seed a file as if another session had created it.
        pub fn insert_file(&self, id: &str, name: &str, content: &str) {
            let file = DriveFile { id: id.to_string(), name: name.to_string() };
            self.files.lock().unwrap().push((file, content.to_string()));
        }

        pub fn content_of(&self, id: &str) -> Option<String> {
            self.files.lock().unwrap().iter().find(|(f, _)| f.id == id).map(|(_, c)| c.clone())
        }

        pub fn file_count(&self) -> usize {
            self.files.lock().unwrap().len()
        }

        /// Make every following call fail with `err`; `None` restores normal behaviour.
        pub fn fail_with(&self, err: Option<DriveError>) {
            *self.fail_with.lock().unwrap() = err;
        }

        fn check(&self, token: &str) -> Result<(), DriveError> {
            if let Some(e) = self.fail_with.lock().unwrap().clone() {
                return Err(e);
            }
            if token.is_empty() {
                return Err(DriveError::Http { status: 401, message: "missing bearer".into() });
            }
            Ok(())
        }
    }

    #[async_trait]
    impl DriveApi for InMemoryDrive {
        async fn list_by_name(&self, token: &str, name: &str) -> Result<Vec<DriveFile>, DriveError> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            self.check(token)?;
            let files = self.files.lock().unwrap();
            Ok(files.iter().filter(|(f, _)| f.name == name).map(|(f, _)| f.clone()).collect())
        }

        async fn get_content(&self, token: &str, file_id: &str) -> Result<String, DriveError> {
            self.get_calls.fetch_add(1, Ordering::SeqCst);
            self.check(token)?;
            self.content_of(file_id)
                .ok_or_else(|| DriveError::Http { status: 404, message: format!("file {file_id} not found") })
        }

        async fn create(&self, token: &str, name: &str, content: &str) -> Result<DriveFile, DriveError> {
            let n = self.create_calls.fetch_add(1, Ordering::SeqCst);
            self.check(token)?;
            let file = DriveFile { id: format!("file-{}", n + 1), name: name.to_string() };
            self.files.lock().unwrap().push((file.clone(), content.to_string()));
            Ok(file)
        }

        async fn update_content(&self, token: &str, file_id: &str, content: &str) -> Result<(), DriveError> {
            self.update_calls.fetch_add(1, Ordering::SeqCst);
            self.check(token)?;
            let mut files = self.files.lock().unwrap();
            let entry = files
                .iter_mut()
                .find(|(f, _)| f.id == file_id)
                .ok_or_else(|| DriveError::Http { status: 404, message: format!("file {file_id} not found") })?;
            entry.1 = content.to_string();
            Ok(())
        }
    }

    /// Loader handing out a fixed client and counting how often it ran.
    pub struct StaticLoader {
        api: Arc<dyn DriveApi>,
        pub loads: AtomicUsize,
    }

    impl StaticLoader {
        pub fn new(api: Arc<dyn DriveApi>) -> Arc<Self> {
            Arc::new(Self { api, loads: AtomicUsize::new(0) })
        }
    }

    #[async_trait]
    impl DriveClientLoader for StaticLoader {
        async fn load(&self) -> Result<Arc<dyn DriveApi>, DriveError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            Ok(Arc::clone(&self.api))
        }
    }

    /// Loader that always fails, like a client library that cannot be fetched.
    pub struct FailingLoader;

    #[async_trait]
    impl DriveClientLoader for FailingLoader {
        async fn load(&self) -> Result<Arc<dyn DriveApi>, DriveError> {
            Err(DriveError::ClientLoad("client library unavailable".into()))
        }
    }
}
