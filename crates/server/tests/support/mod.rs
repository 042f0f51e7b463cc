#![allow(dead_code)]

use std::net::SocketAddr;

use axum::Router;
use configs::AppConfig;
use tokio::net::TcpListener;
use uuid::Uuid;

use server::startup::{build_app, build_state};

/// Defaults plus an isolated data dir; drive sync stays off unless the test configures it.
pub fn test_config() -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.storage.data_dir = std::env::temp_dir()
        .join(format!("focusdash-test-{}", Uuid::new_v4()))
        .display()
        .to_string();
    cfg.server.frontend_dir = "target/test-frontend".into();
    cfg
}

/// Serve `app` on an ephemeral port and return its base url.
pub async fn spawn(app: Router) -> anyhow::Result<String> {
    let listener = TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0)).await?;
    let addr: SocketAddr = listener.local_addr()?;
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            eprintln!("server error: {}", e);
        }
    });
    Ok(format!("http://{}:{}", addr.ip(), addr.port()))
}

pub async fn start(cfg: &AppConfig) -> anyhow::Result<String> {
    let state = build_state(cfg).await?;
    spawn(build_app(state, cfg)).await
}
