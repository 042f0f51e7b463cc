use std::time::Duration;

use common::observability::{TODOIST_ERRORS_TOTAL, TODOIST_REQUESTS_TOTAL};
use configs::TodoistConfig;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::domain::{NewTask, Project, Task};
use super::error::TodoistError;
use super::normalize;

/// Upper bound on cursor hops for one list call.
const MAX_PAGES: usize = 50;

/// Todoist REST client. The api token is supplied per call by the browser; nothing is stored.
#[derive(Clone)]
pub struct TodoistClient {
    http: Client,
    base_url: String,
}

impl TodoistClient {
    pub fn new(http: Client, base_url: &str) -> Self {
        Self { http, base_url: base_url.trim_end_matches('/').to_string() }
    }

    pub fn from_config(cfg: &TodoistConfig) -> Result<Self, TodoistError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(cfg.request_timeout_secs))
            .build()
            .map_err(|e| TodoistError::Network(e.to_string()))?;
        Ok(Self::new(http, &cfg.base_url))
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// `tasks/<id>[/<action>]`, with `id` encoded as one path segment.
    fn task_url(&self, id: &str, action: Option<&str>) -> Result<Url, TodoistError> {
        if matches!(id.trim(), "" | "." | "..") {
            return Err(TodoistError::InvalidId(id.to_string()));
        }
        let mut url = Url::parse(&self.url("tasks")).map_err(|e| TodoistError::Network(format!("bad base url: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| TodoistError::Network(format!("base url {} cannot carry a path", self.base_url)))?
            .push(id)
            .extend(action);
        Ok(url)
    }

    async fn execute(req: RequestBuilder, token: &str) -> Result<Option<Value>, TodoistError> {
        let resp = req.bearer_auth(token).send().await?;
        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(TodoistError::Unauthorized);
        }
        if !status.is_success() {
            let mut message = resp.text().await.unwrap_or_default();
            message.truncate(512);
            return Err(TodoistError::Upstream { status: status.as_u16(), message });
        }
        let body = resp.bytes().await?;
        if body.is_empty() {
            return Ok(None);
        }
        serde_json::from_slice(&body).map(Some).map_err(|e| TodoistError::Parse(e.to_string()))
    }

    async fn send(&self, req: RequestBuilder, token: &str) -> Result<Option<Value>, TodoistError> {
        TODOIST_REQUESTS_TOTAL.inc();
        let result = Self::execute(req, token).await;
        if let Err(e) = &result {
            TODOIST_ERRORS_TOTAL.inc();
            warn!(error = %e, "todoist request failed");
        }
        result
    }

    async fn send_json(&self, req: RequestBuilder, token: &str) -> Result<Value, TodoistError> {
        self.send(req, token)
            .await?
            .ok_or_else(|| TodoistError::Parse("empty response body".into()))
    }

    /// GET a list endpoint, following `next_cursor` until the last page.
    async fn list_all<T>(
        &self,
        token: &str,
        path: &str,
        params: &[(&str, &str)],
        decode: fn(Value) -> Result<(Vec<T>, Option<String>), TodoistError>,
    ) -> Result<Vec<T>, TodoistError> {
        let mut out = Vec::new();
        let mut cursor: Option<String> = None;
        for _ in 0..MAX_PAGES {
            let mut req = self.http.get(self.url(path)).query(params);
            if let Some(c) = &cursor {
                req = req.query(&[("cursor", c.as_str())]);
            }
            let (items, next) = decode(self.send_json(req, token).await?)?;
            out.extend(items);
            match next {
                Some(next) => cursor = Some(next),
                None => {
                    debug!(%path, count = out.len(), "todoist list complete");
                    return Ok(out);
                }
            }
        }
        warn!(%path, "todoist pagination stopped at page limit");
        Ok(out)
    }

    pub async fn list_projects(&self, token: &str) -> Result<Vec<Project>, TodoistError> {
        self.list_all(token, "projects", &[], normalize::projects_from_value).await
    }

    pub async fn list_tasks(&self, token: &str, project_id: Option<&str>) -> Result<Vec<Task>, TodoistError> {
        let params: Vec<(&str, &str)> = project_id.into_iter().map(|p| ("project_id", p)).collect();
        self.list_all(token, "tasks", &params, normalize::tasks_from_value).await
    }

    pub async fn create_task(&self, token: &str, task: &NewTask) -> Result<Task, TodoistError> {
        let mut body = json!({ "content": task.text });
        if let Some(p) = &task.project_id {
            body["project_id"] = json!(p);
        }
        if let Some(d) = &task.due {
            body["due_string"] = json!(d);
        }
        let value = self.send_json(self.http.post(self.url("tasks")).json(&body), token).await?;
        normalize::task_from_value(value)
    }

    pub async fn close_task(&self, token: &str, id: &str) -> Result<(), TodoistError> {
        self.send(self.http.post(self.task_url(id, Some("close"))?), token).await?;
        Ok(())
    }

    pub async fn reopen_task(&self, token: &str, id: &str) -> Result<(), TodoistError> {
        self.send(self.http.post(self.task_url(id, Some("reopen"))?), token).await?;
        Ok(())
    }

    pub async fn delete_task(&self, token: &str, id: &str) -> Result<(), TodoistError> {
        self.send(self.http.delete(self.task_url(id, None)?), token).await?;
        Ok(())
    }
}
