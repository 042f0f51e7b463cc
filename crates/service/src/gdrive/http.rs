use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use configs::GDriveConfig;
use reqwest::{Client, Response};
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use super::api::{DriveApi, DriveClientLoader, DriveFile};
use super::error::DriveError;

/// Drive v3 REST client.
pub struct HttpDriveApi {
    http: Client,
    api_base: String,
    upload_base: String,
}

#[derive(Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

impl HttpDriveApi {
    pub fn new(http: Client, api_base: &str, upload_base: &str) -> Self {
        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            upload_base: upload_base.trim_end_matches('/').to_string(),
        }
    }
}

/// Turn non-2xx responses into [`DriveError::Http`] carrying a trimmed body.
async fn check(resp: Response) -> Result<Response, DriveError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let mut message = resp.text().await.unwrap_or_default();
    message.truncate(512);
    Err(DriveError::Http { status: status.as_u16(), message })
}

/// Drive query literals are single-quoted; quotes and backslashes must be escaped.
fn quote(name: &str) -> String {
    name.replace('\\', "\\\\").replace('\'', "\\'")
}

fn multipart_related(boundary: &str, metadata: &str, content: &str) -> String {
    format!(
        "--{b}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{metadata}\r\n\
         --{b}\r\nContent-Type: application/json\r\n\r\n{content}\r\n--{b}--",
        b = boundary
    )
}

#[async_trait]
impl DriveApi for HttpDriveApi {
    async fn list_by_name(&self, token: &str, name: &str) -> Result<Vec<DriveFile>, DriveError> {
        let q = format!("name = '{}' and trashed = false", quote(name));
        let resp = self
            .http
            .get(format!("{}/drive/v3/files", self.api_base))
            .bearer_auth(token)
            .query(&[("q", q.as_str()), ("spaces", "drive"), ("fields", "files(id, name)")])
            .send()
            .await?;
        let list: FileList = check(resp).await?.json().await?;
        debug!(%name, matches = list.files.len(), "drive list by name");
        Ok(list.files)
    }

    async fn get_content(&self, token: &str, file_id: &str) -> Result<String, DriveError> {
        let resp = self
            .http
            .get(format!("{}/drive/v3/files/{}", self.api_base, file_id))
            .bearer_auth(token)
            .query(&[("alt", "media")])
            .send()
            .await?;
        Ok(check(resp).await?.text().await?)
    }

    async fn create(&self, token: &str, name: &str, content: &str) -> Result<DriveFile, DriveError> {
        let boundary = format!("focusdash-{}", Uuid::new_v4().simple());
        let metadata = serde_json::json!({ "name": name, "mimeType": "application/json" }).to_string();
        let resp = self
            .http
            .post(format!("{}/upload/drive/v3/files", self.upload_base))
            .bearer_auth(token)
            .query(&[("uploadType", "multipart"), ("fields", "id, name")])
            .header(reqwest::header::CONTENT_TYPE, format!("multipart/related; boundary={boundary}"))
            .body(multipart_related(&boundary, &metadata, content))
            .send()
            .await?;
        Ok(check(resp).await?.json().await?)
    }

    async fn update_content(&self, token: &str, file_id: &str, content: &str) -> Result<(), DriveError> {
        let resp = self
            .http
            .patch(format!("{}/upload/drive/v3/files/{}", self.upload_base, file_id))
            .bearer_auth(token)
            .query(&[("uploadType", "media")])
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(content.to_string())
            .send()
            .await?;
        check(resp).await?;
        Ok(())
    }
}

/// Builds the HTTP client from configuration when the adapter first needs it.
pub struct HttpDriveLoader {
    api_base: String,
    upload_base: String,
    timeout: Duration,
}

impl HttpDriveLoader {
    pub fn from_config(cfg: &GDriveConfig) -> Self {
        Self {
            api_base: cfg.api_base_url.clone(),
            upload_base: cfg.upload_base_url.clone(),
            timeout: Duration::from_secs(cfg.request_timeout_secs),
        }
    }
}

#[async_trait]
impl DriveClientLoader for HttpDriveLoader {
    async fn load(&self) -> Result<Arc<dyn DriveApi>, DriveError> {
        let http = Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| DriveError::ClientLoad(e.to_string()))?;
        Ok(Arc::new(HttpDriveApi::new(http, &self.api_base, &self.upload_base)))
    }
}
