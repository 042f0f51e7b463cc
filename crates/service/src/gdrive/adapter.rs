use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use common::observability::{DRIVE_FLUSH_ERRORS_TOTAL, DRIVE_FLUSH_TOTAL};
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::{Mutex, OnceCell};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use super::api::{DriveApi, DriveClientLoader};
use super::error::{DriveError, SessionError};
use super::oauth::TokenProvider;
use super::token::{SessionToken, TokenStore};
use crate::clock::Clock;
use crate::storage::{StorageAdapter, StorageError, StorageKind, StorageResult};

/// Lifecycle of the adapter, derived from what it currently holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DriveState {
    Uninitialized,
    ClientLoaded,
    Authenticated,
    FileResolved,
    Ready,
}

#[derive(Debug, Clone)]
pub struct DriveOptions {
    /// Name of the single file used as the document store.
    pub file_name: String,
    /// Quiet period before a buffered write is flushed.
    pub write_debounce: Duration,
}

impl Default for DriveOptions {
    fn default() -> Self {
        Self { file_name: "focus-dashboard-data.json".into(), write_debounce: Duration::from_millis(2000) }
    }
}

impl DriveOptions {
    pub fn from_config(cfg: &configs::GDriveConfig) -> Self {
        Self { file_name: cfg.file_name.clone(), write_debounce: Duration::from_millis(cfg.write_debounce_ms) }
    }
}

#[derive(Default)]
struct Session {
    token: Option<SessionToken>,
    file_id: Option<String>,
    cache: Option<Map<String, Value>>,
    /// Set when an upload was refused for good; every later call reports it.
    revoked: Option<DriveError>,
}

struct Inner {
    loader: Arc<dyn DriveClientLoader>,
    api: OnceCell<Arc<dyn DriveApi>>,
    tokens: TokenStore,
    clock: Arc<dyn Clock>,
    options: DriveOptions,
    session: Mutex<Session>,
    pending: StdMutex<Option<JoinHandle<()>>>,
}

/// Persists the dashboard document as one JSON file in Google Drive.
///
/// Reads are served from an in-memory copy of the file, hydrated on first use. Writes
/// update that copy at once and schedule a full-document upload after
/// [`DriveOptions::write_debounce`]; each new write cancels the upload scheduled before it.
/// Removals are uploaded immediately. Uploads never check for concurrent writers, so the
/// last flush from any session wins.
#[derive(Clone)]
pub struct GDriveAdapter {
    inner: Arc<Inner>,
}

impl GDriveAdapter {
    pub fn new(
        loader: Arc<dyn DriveClientLoader>,
        tokens: TokenStore,
        clock: Arc<dyn Clock>,
        options: DriveOptions,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                loader,
                api: OnceCell::new(),
                tokens,
                clock,
                options,
                session: Mutex::new(Session::default()),
                pending: StdMutex::new(None),
            }),
        }
    }

    pub async fn state(&self) -> DriveState {
        if !self.inner.api.initialized() {
            return DriveState::Uninitialized;
        }
        let session = self.inner.session.lock().await;
        match (&session.token, &session.file_id, &session.cache) {
            (None, _, _) => DriveState::ClientLoaded,
            (Some(_), None, _) => DriveState::Authenticated,
            (Some(_), Some(_), None) => DriveState::FileResolved,
            (Some(_), Some(_), Some(_)) => DriveState::Ready,
        }
    }

    /// Load the Drive client once; concurrent callers share the same load.
    pub async fn initialize(&self) -> Result<Arc<dyn DriveApi>, DriveError> {
        self.inner.initialize().await
    }

    /// Interactive connect: obtain a token from `provider`, mirror it, then resolve the file.
    #[instrument(skip(self, provider))]
    pub async fn connect(&self, provider: &dyn TokenProvider) -> Result<String, DriveError> {
        self.initialize().await?;
        let now = self.inner.clock.now();
        let token = provider.obtain_token(now).await?;
        if !token.is_valid_at(now) {
            return Err(DriveError::TokenExpired);
        }
        self.adopt_token(token.clone()).await;
        self.inner.tokens.save(&token).await;

        match self.find_or_create_config_file().await {
            Ok(file_id) => {
                info!(%file_id, "drive connected");
                Ok(file_id)
            }
            Err(e) => {
                warn!(error = %e, "drive connect could not resolve config file");
                self.forget_session().await;
                Err(e)
            }
        }
    }

    /// Silent reconnect from the mirrored token. Clears the token on any failure.
    #[instrument(skip(self))]
    pub async fn restore_session(&self) -> Result<String, SessionError> {
        let token = self.inner.tokens.load().await.ok_or(SessionError::NoToken)?;
        if !token.is_valid_at(self.inner.clock.now()) {
            info!(expired_at = %token.expires_at, "cached drive token expired");
            self.inner.tokens.clear().await;
            return Err(SessionError::Expired);
        }
        if let Err(e) = self.initialize().await {
            return Err(e.into());
        }
        self.adopt_token(token).await;
        match self.find_or_create_config_file().await {
            Ok(file_id) => {
                info!(%file_id, "drive session restored");
                Ok(file_id)
            }
            Err(e) => {
                warn!(error = %e, "drive session restore failed");
                self.forget_session().await;
                Err(e.into())
            }
        }
    }

    /// Resolve the config file by name, creating it with `{}` when absent. The first match
    /// is authoritative; duplicates are left alone.
    pub async fn find_or_create_config_file(&self) -> Result<String, DriveError> {
        let api = self.initialize().await?;
        let mut session = self.inner.session.lock().await;
        let token = self.inner.bearer(&session)?;
        let name = &self.inner.options.file_name;

        let files = api.list_by_name(&token, name).await?;
        let file_id = match files.into_iter().next() {
            Some(existing) => {
                debug!(file_id = %existing.id, "using existing config file");
                existing.id
            }
            None => {
                let created = api.create(&token, name, "{}").await?;
                info!(file_id = %created.id, %name, "created config file");
                created.id
            }
        };
        if session.file_id.as_deref() != Some(file_id.as_str()) {
            session.cache = None;
        }
        session.file_id = Some(file_id.clone());
        Ok(file_id)
    }

    /// Upload buffered changes now and drop any pending timer. Then forget the token.
    pub async fn disconnect(&self) {
        if let Err(e) = self.flush_now().await {
            warn!(error = %e, "final flush before disconnect failed");
        }
        self.forget_session().await;
        info!("drive disconnected");
    }

    /// Whether a debounced upload is scheduled and has not run yet.
    pub fn has_pending_write(&self) -> bool {
        self.inner
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    pub async fn flush_now(&self) -> Result<(), DriveError> {
        self.inner.cancel_pending();
        self.inner.flush().await
    }

    async fn adopt_token(&self, token: SessionToken) {
        let mut session = self.inner.session.lock().await;
        session.token = Some(token);
        session.revoked = None;
    }

    async fn forget_session(&self) {
        self.inner.cancel_pending();
        {
            let mut session = self.inner.session.lock().await;
            *session = Session::default();
        }
        self.inner.tokens.clear().await;
    }

    async fn get(&self, key: &str) -> Result<Option<Value>, DriveError> {
        let mut session = self.inner.session.lock().await;
        let cache = self.inner.hydrated(&mut session).await?;
        Ok(cache.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), DriveError> {
        {
            let mut session = self.inner.session.lock().await;
            let cache = self.inner.hydrated(&mut session).await?;
            cache.insert(key.to_string(), value);
        }
        self.schedule_flush();
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), DriveError> {
        {
            let mut session = self.inner.session.lock().await;
            let cache = self.inner.hydrated(&mut session).await?;
            cache.remove(key);
        }
        self.flush_now().await
    }

    fn schedule_flush(&self) {
        let inner = Arc::clone(&self.inner);
        let delay = self.inner.options.write_debounce;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = inner.flush().await {
                error!(error = %e, "debounced drive write dropped");
            }
        });
        let previous = self
            .inner
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
    }
}

impl Inner {
    async fn initialize(&self) -> Result<Arc<dyn DriveApi>, DriveError> {
        let api = self
            .api
            .get_or_try_init(|| async {
                let api = self.loader.load().await?;
                info!("drive client loaded");
                Ok::<_, DriveError>(api)
            })
            .await?;
        Ok(Arc::clone(api))
    }

    fn client(&self) -> Result<Arc<dyn DriveApi>, DriveError> {
        self.api.get().cloned().ok_or(DriveError::NotConnected)
    }

    fn bearer(&self, session: &Session) -> Result<String, DriveError> {
        if let Some(reason) = &session.revoked {
            return Err(reason.clone());
        }
        let token = session.token.as_ref().ok_or(DriveError::NotConnected)?;
        if !token.is_valid_at(self.clock.now()) {
            return Err(DriveError::TokenExpired);
        }
        Ok(token.access_token.clone())
    }

    /// The cached document, fetching it first if only the file handle is known. The token
    /// is checked on every call, so an expired session fails even when the cache is warm.
    async fn hydrated<'s>(&self, session: &'s mut Session) -> Result<&'s mut Map<String, Value>, DriveError> {
        let token = self.bearer(session)?;
        if session.cache.is_none() {
            let file_id = session.file_id.clone().ok_or(DriveError::NotConnected)?;
            let raw = self.client()?.get_content(&token, &file_id).await?;
            let doc = parse_document(&raw)?;
            debug!(%file_id, keys = doc.len(), "drive document hydrated");
            session.cache = Some(doc);
        }
        session.cache.as_mut().ok_or(DriveError::NotConnected)
    }

    fn cancel_pending(&self) {
        let pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(handle) = pending {
            handle.abort();
        }
    }

    /// Upload the whole cached document, as it is right now. A fatal failure revokes the
    /// session and drops the mirrored token.
    async fn flush(&self) -> Result<(), DriveError> {
        let mut session = self.session.lock().await;
        if session.cache.is_none() {
            return Ok(());
        }
        let result = self.upload(&session).await;
        if let Err(e) = &result {
            DRIVE_FLUSH_ERRORS_TOTAL.inc();
            warn!(error = %e, "drive write failed");
            if e.is_fatal() {
                session.token = None;
                session.revoked = Some(e.clone());
                drop(session);
                self.tokens.clear().await;
            }
        }
        result
    }

    async fn upload(&self, session: &Session) -> Result<(), DriveError> {
        let Some(cache) = session.cache.as_ref() else {
            return Ok(());
        };
        let file_id = session.file_id.as_deref().ok_or(DriveError::NotConnected)?;
        let token = self.bearer(session)?;
        let body = serde_json::to_string(cache).map_err(|e| DriveError::Parse(e.to_string()))?;

        DRIVE_FLUSH_TOTAL.inc();
        self.client()?.update_content(&token, file_id, &body).await?;
        debug!(%file_id, bytes = body.len(), "drive document written");
        Ok(())
    }
}

fn parse_document(raw: &str) -> Result<Map<String, Value>, DriveError> {
    if raw.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(DriveError::Parse(format!("config file holds {}, expected an object", kind_of(&other)))),
        Err(e) => Err(DriveError::Parse(e.to_string())),
    }
}

fn kind_of(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[async_trait]
impl StorageAdapter for GDriveAdapter {
    fn kind(&self) -> StorageKind {
        StorageKind::GDrive
    }

    async fn get_item(&self, key: &str) -> StorageResult<Value> {
        self.get(key).await?.ok_or(StorageError::NotFound)
    }

    async fn set_item(&self, key: &str, value: Value) -> StorageResult<()> {
        Ok(self.set(key, value).await?)
    }

    async fn remove_item(&self, key: &str) -> StorageResult<()> {
        Ok(self.remove(key).await?)
    }

    async fn flush(&self) -> StorageResult<()> {
        Ok(self.flush_now().await?)
    }
}
