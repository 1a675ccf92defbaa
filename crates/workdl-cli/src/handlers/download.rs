//! Download command handler.
//!
//! Starts one fetch and follows the session until it reaches a terminal
//! status. Ctrl-C asks the engine to stop and keeps following until the
//! session reports `stopped`.

use anyhow::{Result, bail};
use tracing::info;
use workdl_core::DownloadStatus;

use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::presentation::SessionProgress;

pub async fn execute(ctx: &CliContext, item: &str) -> Result<()> {
    let mut rx = ctx.engine.subscribe_status();
    let ack = ctx.engine.start_download(item).await?;
    info!(target: "workdl.cli", item_id = %ack.item_id, generation = ack.generation, "Download started");

    let mut progress = SessionProgress::new(ack.item_id.as_str());
    let mut stop_requested = false;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let outcome = loop {
        let view = rx.borrow_and_update().clone();
        if view.generation == ack.generation {
            if view.status.is_terminal() {
                break view;
            }
            if view.status == DownloadStatus::Idle {
                bail!("download session ended without a result");
            }
            progress.update(&view);
        } else if view.generation > ack.generation {
            bail!("download session was replaced by another download");
        }

        tokio::select! {
            biased;
            signal = &mut ctrl_c, if !stop_requested => {
                stop_requested = true;
                if signal.is_ok() {
                    println!("\nStopping download...");
                    ctx.engine.stop();
                }
            }
            changed = rx.changed() => {
                if changed.is_err() {
                    bail!("download engine shut down");
                }
            }
        }
    };

    progress.finish(&outcome);
    match outcome.status {
        DownloadStatus::Completed => Ok(()),
        DownloadStatus::Stopped => Err(CliError::Failed("download stopped".to_string()).into()),
        _ => {
            let reason = outcome
                .message
                .unwrap_or_else(|| "download failed".to_string());
            Err(CliError::Failed(reason).into())
        }
    }
}
