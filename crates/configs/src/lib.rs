use anyhow::Result;
use serde::Deserialize;
use anyhow::anyhow;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub gdrive: GDriveConfig,
    #[serde(default)]
    pub todoist: TodoistConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub worker_threads: Option<usize>,
    #[serde(default = "default_frontend_dir")]
    pub frontend_dir: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8080,
            worker_threads: Some(4),
            frontend_dir: default_frontend_dir(),
        }
    }
}

/// Where the local key/value store lives.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_local_store_file")]
    pub local_store_file: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            local_store_file: default_local_store_file(),
            namespace: default_namespace(),
        }
    }
}

impl StorageConfig {
    pub fn local_store_path(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.data_dir).join(&self.local_store_file)
    }
}

/// Google Drive OAuth client and file API settings.
#[derive(Debug, Clone, Deserialize)]
pub struct GDriveConfig {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,
    #[serde(default = "default_auth_url")]
    pub auth_url: String,
    #[serde(default = "default_token_url")]
    pub token_url: String,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_upload_base_url")]
    pub upload_base_url: String,
    #[serde(default = "default_scope")]
    pub scope: String,
    #[serde(default = "default_file_name")]
    pub file_name: String,
    #[serde(default = "default_write_debounce_ms")]
    pub write_debounce_ms: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for GDriveConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: default_redirect_uri(),
            auth_url: default_auth_url(),
            token_url: default_token_url(),
            api_base_url: default_api_base_url(),
            upload_base_url: default_upload_base_url(),
            scope: default_scope(),
            file_name: default_file_name(),
            write_debounce_ms: default_write_debounce_ms(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TodoistConfig {
    #[serde(default = "default_todoist_base_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for TodoistConfig {
    fn default() -> Self {
        Self { base_url: default_todoist_base_url(), request_timeout_secs: default_request_timeout() }
    }
}

fn default_frontend_dir() -> String { "frontend".into() }
fn default_data_dir() -> String { "data".into() }
fn default_local_store_file() -> String { "local_store.json".into() }
fn default_namespace() -> String { "focusdash".into() }
fn default_redirect_uri() -> String { "http://127.0.0.1:8080/api/gdrive/callback".into() }
fn default_auth_url() -> String { "https://accounts.google.com/o/oauth2/v2/auth".into() }
fn default_token_url() -> String { "https://oauth2.googleapis.com/token".into() }
fn default_api_base_url() -> String { "https://www.googleapis.com".into() }
fn default_upload_base_url() -> String { "https://www.googleapis.com".into() }
fn default_scope() -> String { "https://www.googleapis.com/auth/drive.file".into() }
fn default_file_name() -> String { "focus-dashboard-data.json".into() }
fn default_write_debounce_ms() -> u64 { 2000 }
fn default_request_timeout() -> u64 { 15 }
fn default_todoist_base_url() -> String { "https://api.todoist.com/api/v1".into() }

pub fn load_default() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    load_from_file(&path)
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let cfg: AppConfig = toml::from_str(&content)?;
    Ok(cfg)
}

impl AppConfig {
    /// Load `config.toml` (or `CONFIG_PATH`), falling back to defaults when the file is absent,
    /// then fill gaps from the environment and validate.
    pub fn load_and_validate() -> Result<Self> {
        let mut cfg = match load_default() {
            Ok(cfg) => cfg,
            Err(e) if is_not_found(&e) => AppConfig::default(),
            Err(e) => return Err(e),
        };
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.server.normalize_from_env();
        self.server.normalize()?;
        self.storage.normalize_from_env();
        self.storage.validate()?;
        self.gdrive.normalize_from_env();
        self.gdrive.validate()?;
        self.todoist.normalize_from_env();
        self.todoist.validate()?;
        Ok(())
    }
}

fn is_not_found(e: &anyhow::Error) -> bool {
    e.downcast_ref::<std::io::Error>()
        .map(|io| io.kind() == std::io::ErrorKind::NotFound)
        .unwrap_or(false)
}

fn validate_http_url(field: &str, url: &str) -> Result<()> {
    let lower = url.trim().to_lowercase();
    if !(lower.starts_with("http://") || lower.starts_with("https://")) {
        return Err(anyhow!("{field} must start with http:// or https://"));
    }
    Ok(())
}

impl ServerConfig {
    fn normalize_from_env(&mut self) {
        if let Ok(host) = std::env::var("SERVER_HOST") {
            if !host.trim().is_empty() { self.host = host; }
        }
        if let Some(port) = std::env::var("SERVER_PORT").ok().and_then(|p| p.parse::<u16>().ok()) {
            self.port = port;
        }
    }

    fn normalize(&mut self) -> Result<()> {
        if self.host.trim().is_empty() {
            self.host = "127.0.0.1".to_string();
        }
        if self.port == 0 {
            return Err(anyhow!("server.port must be in 1..=65535"));
        }
        if let Some(w) = self.worker_threads {
            if w == 0 { self.worker_threads = Some(4); }
        } else {
            self.worker_threads = Some(4);
        }
        Ok(())
    }
}

impl StorageConfig {
    fn normalize_from_env(&mut self) {
        if let Ok(dir) = std::env::var("DATA_DIR") {
            if !dir.trim().is_empty() { self.data_dir = dir; }
        }
    }

    fn validate(&self) -> Result<()> {
        if self.data_dir.trim().is_empty() {
            return Err(anyhow!("storage.data_dir is empty"));
        }
        if self.local_store_file.trim().is_empty() {
            return Err(anyhow!("storage.local_store_file is empty"));
        }
        if self.namespace.contains(':') {
            return Err(anyhow!("storage.namespace must not contain ':'"));
        }
        Ok(())
    }
}

impl GDriveConfig {
    fn normalize_from_env(&mut self) {
        if self.client_id.trim().is_empty() {
            if let Ok(v) = std::env::var("GOOGLE_CLIENT_ID") { self.client_id = v; }
        }
        if self.client_secret.trim().is_empty() {
            if let Ok(v) = std::env::var("GOOGLE_CLIENT_SECRET") { self.client_secret = v; }
        }
        if let Ok(v) = std::env::var("GOOGLE_REDIRECT_URI") {
            if !v.trim().is_empty() { self.redirect_uri = v; }
        }
    }

    /// Drive sync is optional; an empty client id simply disables the connect flow.
    pub fn is_configured(&self) -> bool {
        !self.client_id.trim().is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        validate_http_url("gdrive.redirect_uri", &self.redirect_uri)?;
        validate_http_url("gdrive.auth_url", &self.auth_url)?;
        validate_http_url("gdrive.token_url", &self.token_url)?;
        validate_http_url("gdrive.api_base_url", &self.api_base_url)?;
        validate_http_url("gdrive.upload_base_url", &self.upload_base_url)?;
        if self.file_name.trim().is_empty() {
            return Err(anyhow!("gdrive.file_name is empty"));
        }
        if !(100..=60_000).contains(&self.write_debounce_ms) {
            return Err(anyhow!("gdrive.write_debounce_ms must be within 100..=60000"));
        }
        if self.request_timeout_secs == 0 {
            return Err(anyhow!("gdrive.request_timeout_secs must be positive"));
        }
        Ok(())
    }
}

impl TodoistConfig {
    fn normalize_from_env(&mut self) {
        if let Ok(v) = std::env::var("TODOIST_BASE_URL") {
            if !v.trim().is_empty() { self.base_url = v; }
        }
        self.base_url = self.base_url.trim_end_matches('/').to_string();
    }

    fn validate(&self) -> Result<()> {
        validate_http_url("todoist.base_url", &self.base_url)?;
        if self.request_timeout_secs == 0 {
            return Err(anyhow!("todoist.request_timeout_secs must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let cfg: AppConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.gdrive.write_debounce_ms, 2000);
        assert_eq!(cfg.gdrive.file_name, "focus-dashboard-data.json");
        assert_eq!(cfg.storage.namespace, "focusdash");
        assert!(!cfg.gdrive.is_configured());
    }

    #[test]
    fn partial_sections_keep_field_defaults() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [gdrive]
            client_id = "abc.apps.googleusercontent.com"
            write_debounce_ms = 500

            [storage]
            data_dir = "/tmp/fd"
            "#,
        )
        .unwrap();
        assert!(cfg.gdrive.is_configured());
        assert_eq!(cfg.gdrive.write_debounce_ms, 500);
        assert_eq!(cfg.gdrive.scope, "https://www.googleapis.com/auth/drive.file");
        assert_eq!(cfg.storage.local_store_path(), std::path::PathBuf::from("/tmp/fd/local_store.json"));
    }

    #[test]
    fn debounce_out_of_range_is_rejected() {
        let mut g = GDriveConfig::default();
        g.write_debounce_ms = 5;
        assert!(g.validate().is_err());
    }

    #[test]
    fn non_http_todoist_base_is_rejected() {
        let t = TodoistConfig { base_url: "ftp://todoist".into(), request_timeout_secs: 5 };
        assert!(t.validate().is_err());
    }
}
