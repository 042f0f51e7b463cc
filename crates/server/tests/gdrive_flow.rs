mod support;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{Form, Path, State},
    http::{HeaderMap, StatusCode as AxumStatus},
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};
use configs::AppConfig;
use reqwest::StatusCode;
use serde_json::{json, Value};

use support::{spawn, start, test_config};

const FILE_NAME: &str = "focus-dashboard-data.json";
const ACCESS_TOKEN: &str = "drive-access-1";

/// Files held by the fake Drive: id -> content.
#[derive(Clone, Default)]
struct FakeGoogle {
    files: Arc<Mutex<HashMap<String, String>>>,
    creates: Arc<Mutex<usize>>,
}

impl FakeGoogle {
    fn content(&self, id: &str) -> Option<Value> {
        let files = self.files.lock().unwrap();
        files.get(id).and_then(|c| serde_json::from_str(c).ok())
    }

    fn file_count(&self) -> usize {
        self.files.lock().unwrap().len()
    }
}

fn bearer_ok(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("Bearer {ACCESS_TOKEN}"))
        .unwrap_or(false)
}

async fn token(Form(form): Form<HashMap<String, String>>) -> impl IntoResponse {
    match form.get("code").map(String::as_str) {
        Some("good-code") if form.get("grant_type").map(String::as_str) == Some("authorization_code") => {
            Json(json!({"access_token": ACCESS_TOKEN, "expires_in": 3600, "token_type": "Bearer"})).into_response()
        }
        _ => (AxumStatus::BAD_REQUEST, Json(json!({"error": "invalid_grant", "error_description": "Bad code"})))
            .into_response(),
    }
}

async fn list_files(State(g): State<FakeGoogle>, headers: HeaderMap) -> impl IntoResponse {
    if !bearer_ok(&headers) {
        return AxumStatus::UNAUTHORIZED.into_response();
    }
    let files: Vec<Value> = g
        .files
        .lock()
        .unwrap()
        .keys()
        .map(|id| json!({"id": id, "name": FILE_NAME}))
        .collect();
    Json(json!({"files": files})).into_response()
}

async fn create_file(State(g): State<FakeGoogle>, headers: HeaderMap) -> impl IntoResponse {
    if !bearer_ok(&headers) {
        return AxumStatus::UNAUTHORIZED.into_response();
    }
    let id = {
        let mut creates = g.creates.lock().unwrap();
        *creates += 1;
        format!("file-{}", *creates)
    };
    g.files.lock().unwrap().insert(id.clone(), "{}".to_string());
    Json(json!({"id": id, "name": FILE_NAME})).into_response()
}

async fn get_file(State(g): State<FakeGoogle>, headers: HeaderMap, Path(id): Path<String>) -> impl IntoResponse {
    if !bearer_ok(&headers) {
        return AxumStatus::UNAUTHORIZED.into_response();
    }
    match g.files.lock().unwrap().get(&id) {
        Some(content) => content.clone().into_response(),
        None => AxumStatus::NOT_FOUND.into_response(),
    }
}

async fn update_file(
    State(g): State<FakeGoogle>,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: String,
) -> impl IntoResponse {
    if !bearer_ok(&headers) {
        return AxumStatus::UNAUTHORIZED.into_response();
    }
    g.files.lock().unwrap().insert(id.clone(), body);
    Json(json!({"id": id})).into_response()
}

fn fake_google(g: FakeGoogle) -> Router {
    Router::new()
        .route("/token", post(token))
        .route("/drive/v3/files", get(list_files))
        .route("/drive/v3/files/:id", get(get_file))
        .route("/upload/drive/v3/files", post(create_file))
        .route("/upload/drive/v3/files/:id", patch(update_file))
        .with_state(g)
}

async fn drive_config(google: &FakeGoogle) -> anyhow::Result<AppConfig> {
    let base = spawn(fake_google(google.clone())).await?;
    let mut cfg = test_config();
    cfg.gdrive.client_id = "test-client".into();
    cfg.gdrive.client_secret = "test-secret".into();
    cfg.gdrive.auth_url = format!("{base}/auth");
    cfg.gdrive.token_url = format!("{base}/token");
    cfg.gdrive.api_base_url = base.clone();
    cfg.gdrive.upload_base_url = base;
    cfg.gdrive.write_debounce_ms = 100;
    Ok(cfg)
}

#[tokio::test]
async fn auth_url_carries_client_and_state() -> anyhow::Result<()> {
    let google = FakeGoogle::default();
    let base = start(&drive_config(&google).await?).await?;

    let body: Value = reqwest::get(format!("{base}/api/gdrive/auth-url")).await?.json().await?;
    let url = body["url"].as_str().unwrap_or_default();
    assert!(url.contains("client_id=test-client"));
    assert!(url.contains("response_type=code"));
    assert!(url.contains(body["state"].as_str().unwrap_or("missing")));
    Ok(())
}

#[tokio::test]
async fn connect_write_restore_and_disconnect() -> anyhow::Result<()> {
    let google = FakeGoogle::default();
    let cfg = drive_config(&google).await?;
    let base = start(&cfg).await?;
    let c = reqwest::Client::new();

    c.put(format!("{base}/api/state/notes")).json(&json!("local only")).send().await?;

    let res = c.get(format!("{base}/api/gdrive/callback?code=good-code")).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.json::<Value>().await?, json!({"type": "gdrive"}));
    assert_eq!(google.file_count(), 1);

    // Nothing is carried over from local storage.
    let state: Value = c.get(format!("{base}/api/state")).send().await?.json().await?;
    assert_eq!(state["notes"], "");

    c.put(format!("{base}/api/state/notes")).json(&json!("synced")).send().await?;
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(google.content("file-1").map(|v| v["notes"].clone()), Some(json!("synced")));

    // A second process restores silently from the mirrored token and reuses the file.
    let restarted = start(&cfg).await?;
    let info: Value = c.get(format!("{restarted}/api/storage")).send().await?.json().await?;
    assert_eq!(info, json!({"type": "gdrive"}));
    let state: Value = c.get(format!("{restarted}/api/state")).send().await?.json().await?;
    assert_eq!(state["notes"], "synced");
    assert_eq!(google.file_count(), 1);

    let res = c.post(format!("{base}/api/gdrive/disconnect")).send().await?;
    assert_eq!(res.json::<Value>().await?, json!({"type": "local"}));
    let state: Value = c.get(format!("{base}/api/state")).send().await?.json().await?;
    assert_eq!(state["notes"], "local only");
    Ok(())
}

#[tokio::test]
async fn failed_consent_stays_on_local() -> anyhow::Result<()> {
    let google = FakeGoogle::default();
    let base = start(&drive_config(&google).await?).await?;
    let c = reqwest::Client::new();

    let res = c.get(format!("{base}/api/gdrive/callback?code=stale-code")).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await?;
    assert!(body["detail"].as_str().unwrap_or_default().contains("Bad code"));

    let res = c.get(format!("{base}/api/gdrive/callback?error=access_denied")).send().await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let info: Value = c.get(format!("{base}/api/storage")).send().await?.json().await?;
    assert_eq!(info, json!({"type": "local"}));
    assert_eq!(google.file_count(), 0);
    Ok(())
}
