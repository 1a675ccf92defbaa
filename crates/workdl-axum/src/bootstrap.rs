//! Axum server bootstrap - the composition root.
//!
//! This module is the only place where the engine's concrete adapters are
//! wired together for the web server. The CLI reuses [`build_engine`] so
//! both front ends run the same composition.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::{info, warn};

use workdl_core::{
    EngineEventEmitter, JsonFileSettingsRepository, SettingsRepository, default_settings_path,
    ensure_directory,
};
use workdl_download::{DownloadEngine, EngineConfig, EngineDeps};
use workdl_library::LibraryService;
use workdl_steam::{DefaultSteamClient, SteamClientConfig};

use crate::sse::SseBroadcaster;

/// Default bind address.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 5000;

/// CORS configuration for the web server.
#[derive(Debug, Clone, Default)]
pub enum CorsConfig {
    /// Allow all origins (development mode).
    #[default]
    AllowAll,
    /// Allow specific origins (production mode).
    AllowOrigins(Vec<String>),
}

/// Server configuration for the Axum adapter.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Settings file; `None` uses the default location.
    pub settings_path: Option<PathBuf>,
    pub cors: CorsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            settings_path: None,
            cors: CorsConfig::default(),
        }
    }
}

impl ServerConfig {
    #[must_use]
    pub fn with_settings_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings_path = Some(path.into());
        self
    }

    /// Set CORS to allow specific origins.
    #[must_use]
    pub fn with_allowed_origins(mut self, origins: Vec<String>) -> Self {
        self.cors = CorsConfig::AllowOrigins(origins);
        self
    }

    /// `host:port` to bind.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Application context for the Axum adapter.
pub struct AxumContext {
    pub engine: Arc<DownloadEngine>,
    /// SSE broadcaster for real-time events.
    pub sse: Arc<SseBroadcaster>,
}

impl AxumContext {
    pub const fn new(engine: Arc<DownloadEngine>, sse: Arc<SseBroadcaster>) -> Self {
        Self { engine, sse }
    }
}

/// Open the settings file at `path`, or the default location.
pub fn settings_repository(path: Option<PathBuf>) -> Result<Arc<JsonFileSettingsRepository>> {
    let path = match path {
        Some(path) => path,
        None => default_settings_path()?,
    };
    info!(target: "workdl.config", path = %path.display(), "Using settings file");
    Ok(Arc::new(JsonFileSettingsRepository::new(path)))
}

/// Assemble a [`DownloadEngine`] with the filesystem library and Steam client.
///
/// A configured installation directory must exist (or be creatable) and be
/// writable; anything else is a startup failure.
pub async fn build_engine(
    settings: Arc<dyn SettingsRepository>,
    events: Arc<dyn EngineEventEmitter>,
) -> Result<Arc<DownloadEngine>> {
    let current = settings.load().await.context("Failed to load settings")?;
    match &current.install_dir {
        Some(dir) => ensure_directory(dir)
            .with_context(|| format!("Installation directory {} is unusable", dir.display()))?,
        None => warn!(target: "workdl.config", "No installation directory configured"),
    }

    let details = DefaultSteamClient::new(&SteamClientConfig::new())
        .context("Failed to build Steam client")?;

    let deps = EngineDeps {
        settings,
        library: Arc::new(LibraryService::new()),
        details: Arc::new(details),
        events,
    };
    Ok(Arc::new(DownloadEngine::new(deps, EngineConfig::default())))
}

/// Bootstrap the Axum server with all services.
pub async fn bootstrap(config: &ServerConfig) -> Result<AxumContext> {
    let settings = settings_repository(config.settings_path.clone())?;
    let sse = Arc::new(SseBroadcaster::with_defaults());
    let engine = build_engine(settings, sse.clone()).await?;
    Ok(AxumContext::new(engine, sse))
}

/// Start the web server and run until Ctrl-C.
///
/// A running fetch is stopped on shutdown.
pub async fn start_server(config: ServerConfig) -> Result<()> {
    let ctx = bootstrap(&config).await?;
    let engine = Arc::clone(&ctx.engine);
    let app = crate::routes::create_router(ctx, &config.cors);

    let addr = config.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(target: "workdl.http", "workdl API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if engine.stop() {
        info!(target: "workdl.http", "Stopped running download on shutdown");
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(target: "workdl.http", error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!(target: "workdl.http", "Shutdown requested");
}
