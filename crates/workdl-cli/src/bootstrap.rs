//! CLI bootstrap - the composition root for local commands.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tracing::debug;
use workdl_axum::bootstrap::{build_engine, settings_repository};
use workdl_core::{EngineEvent, EngineEventEmitter};
use workdl_download::DownloadEngine;

/// Engine events are only logged on the command line.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogEmitter;

impl EngineEventEmitter for LogEmitter {
    fn emit(&self, event: EngineEvent) {
        debug!(target: "workdl.events", ?event, "Engine event");
    }
}

/// Fully composed context for local commands.
pub struct CliContext {
    pub engine: Arc<DownloadEngine>,
}

/// Build the engine against the settings file at `config` (or the default).
pub async fn bootstrap(config: Option<PathBuf>) -> Result<CliContext> {
    let settings = settings_repository(config)?;
    let engine = build_engine(settings, Arc::new(LogEmitter)).await?;
    Ok(CliContext { engine })
}
