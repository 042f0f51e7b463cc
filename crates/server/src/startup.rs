use std::{net::SocketAddr, sync::Arc};

use axum::Router;
use configs::AppConfig;
use dotenvy::dotenv;
use service::clock::{Clock, SystemClock};
use service::dashboard::{boot, Dashboard};
use service::gdrive::http::HttpDriveLoader;
use service::gdrive::{DriveClientLoader, DriveOptions, GDriveAdapter, OAuthClient, TokenStore};
use service::storage::{LocalAdapter, LocalKv, PreferenceStore};
use service::todoist::TodoistClient;
use service::runtime;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::errors::StartupError;
use crate::routes;
use crate::state::AppState;

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

/// Open the local store, pick the backend and load the dashboard.
pub async fn build_state(cfg: &AppConfig) -> Result<AppState, StartupError> {
    build_state_with_clock(cfg, Arc::new(SystemClock)).await
}

pub async fn build_state_with_clock(cfg: &AppConfig, clock: Arc<dyn Clock>) -> Result<AppState, StartupError> {
    let kv = LocalKv::new(cfg.storage.local_store_path())
        .await
        .map_err(|e| StartupError::Runtime(e.to_string()))?;
    let local = Arc::new(LocalAdapter::new(kv.clone(), cfg.storage.namespace.clone()));
    let preference = PreferenceStore::new(kv.clone());
    let tokens = TokenStore::new(kv);

    let (drive, oauth) = if cfg.gdrive.is_configured() {
        let oauth = OAuthClient::from_config(&cfg.gdrive).map_err(|e| StartupError::InvalidConfig(e.to_string()))?;
        let loader: Arc<dyn DriveClientLoader> = Arc::new(HttpDriveLoader::from_config(&cfg.gdrive));
        let drive = GDriveAdapter::new(loader, tokens.clone(), clock.clone(), DriveOptions::from_config(&cfg.gdrive));
        (Some(drive), Some(Arc::new(oauth)))
    } else {
        info!("gdrive client id not configured; drive sync disabled");
        (None, None)
    };

    let persistence = Arc::new(boot::activate(preference, &tokens, local, drive.as_ref(), clock.now()).await);
    let dashboard = Dashboard::load(persistence.clone()).await;
    let todoist = TodoistClient::from_config(&cfg.todoist).map_err(|e| StartupError::InvalidConfig(e.to_string()))?;

    Ok(AppState {
        persistence,
        dashboard: Arc::new(RwLock::new(dashboard)),
        drive,
        oauth,
        todoist: Arc::new(todoist),
    })
}

/// Router with CORS and tracing, ready to serve.
pub fn build_app(state: AppState, cfg: &AppConfig) -> Router {
    routes::build_router(state, build_cors(), &cfg.server.frontend_dir)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl+c");
        std::future::pending::<()>().await;
    }
    info!(service = "server", event = "shutdown_signal", "received Ctrl+C, shutting down");
}

/// Public entry: build the app and run the HTTP server until Ctrl+C.
pub async fn run() -> anyhow::Result<()> {
    dotenv().ok();
    let cfg = AppConfig::load_and_validate()?;
    runtime::ensure_env(&cfg.server.frontend_dir, &cfg.storage.data_dir).await?;

    let state = build_state(&cfg).await?;
    let app = build_app(state.clone(), &cfg);

    let addr: SocketAddr = format!("{}:{}", cfg.server.host, cfg.server.port).parse()?;
    info!(%addr, backend = %state.persistence.get_type(), "starting focus dashboard server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    state.persistence.flush().await;
    info!(service = "server", event = "flushed", "pending writes flushed");
    Ok(())
}
