//! Serve command handler.

use std::path::PathBuf;

use anyhow::Result;
use workdl_axum::{ServerConfig, start_server};

/// Run the HTTP API until Ctrl-C.
pub async fn execute(
    config: Option<PathBuf>,
    host: String,
    port: u16,
    allow_origins: Vec<String>,
) -> Result<()> {
    let mut server = ServerConfig {
        host,
        port,
        ..ServerConfig::default()
    };
    if let Some(path) = config {
        server = server.with_settings_path(path);
    }
    if !allow_origins.is_empty() {
        server = server.with_allowed_origins(allow_origins);
    }
    start_server(server).await
}
