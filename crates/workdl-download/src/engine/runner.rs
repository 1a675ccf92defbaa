//! Background queue runner.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use workdl_core::{DownloadStatus, EngineError, EngineEvent, Settings, WorkshopItemId};

use super::DownloadEngine;
use crate::supervisor::FetchRequest;

/// Tally of one queue run.
#[derive(Debug, Default, Clone, Copy)]
struct RunSummary {
    completed: usize,
    failed: usize,
    skipped: usize,
}

/// What the runner does after an item.
enum Next {
    Continue,
    Halt,
}

impl DownloadEngine {
    /// Drain the queue until it is empty, stopped, or one item was processed
    /// with continuous mode off.
    pub(super) async fn run_queue(self: Arc<Self>, cancel: CancellationToken) {
        let mut summary = RunSummary::default();

        while !cancel.is_cancelled() {
            let settings = match self.load_settings().await {
                Ok(settings) => settings,
                Err(e) => {
                    warn!(target: "workdl.queue", error = %e, "Cannot load settings, stopping queue");
                    break;
                }
            };

            let Some(item_id) = self.lock_queue().pop_next() else {
                debug!(target: "workdl.queue", "Queue drained");
                break;
            };
            self.emit_queue_changed();

            if settings.skip_already_installed && self.is_installed(&settings, &item_id).await {
                info!(target: "workdl.queue", item_id = %item_id, "Skipping already installed item");
                self.lock_queue().finish(&item_id);
                self.deps.events.emit(EngineEvent::ItemSkipped {
                    item_id,
                    reason: "already installed".to_string(),
                });
                summary.skipped += 1;
                if !settings.continuous_download {
                    break;
                }
                continue;
            }

            match self.run_item(&item_id, &settings, &cancel, &mut summary).await {
                Next::Continue if settings.continuous_download => {}
                Next::Continue | Next::Halt => break,
            }
        }

        self.runner_active.store(false, Ordering::SeqCst);
        info!(
            target: "workdl.queue",
            completed = summary.completed,
            failed = summary.failed,
            skipped = summary.skipped,
            "Queue run finished"
        );
        self.deps.events.emit(EngineEvent::QueueRunFinished {
            completed: summary.completed,
            failed: summary.failed,
        });
        self.emit_queue_changed();
    }

    async fn run_item(
        &self,
        item_id: &WorkshopItemId,
        settings: &Settings,
        cancel: &CancellationToken,
        summary: &mut RunSummary,
    ) -> Next {
        let request = match FetchRequest::from_settings(item_id.clone(), settings) {
            Ok(request) => request,
            Err(e) => {
                warn!(target: "workdl.queue", item_id = %item_id, error = %e, "Settings incomplete, stopping queue");
                self.lock_queue().requeue_front(item_id.clone());
                return Next::Halt;
            }
        };

        let handle = match self.supervisor.start(request) {
            Ok(handle) => handle,
            Err(e @ EngineError::SpawnFailure(_)) => {
                warn!(target: "workdl.queue", item_id = %item_id, error = %e, "Fetch tool failed to start");
                self.lock_queue().finish(item_id);
                self.announce_spawn_failure(item_id, &e);
                summary.failed += 1;
                return Next::Continue;
            }
            Err(e) => {
                // A direct download slipped in; retry this item on the next run
                warn!(target: "workdl.queue", item_id = %item_id, error = %e, "Supervisor busy, stopping queue");
                self.lock_queue().requeue_front(item_id.clone());
                return Next::Halt;
            }
        };
        self.announce_start(&handle);

        // Stop may have landed between pop and spawn
        if cancel.is_cancelled() {
            self.supervisor.stop();
        }

        let outcome = handle.wait().await;
        self.lock_queue().finish(item_id);
        self.finalize(&outcome).await;

        match outcome.status {
            DownloadStatus::Completed => {
                summary.completed += 1;
                Next::Continue
            }
            DownloadStatus::Stopped => Next::Halt,
            _ => {
                summary.failed += 1;
                Next::Continue
            }
        }
    }

    async fn is_installed(&self, settings: &Settings, item_id: &WorkshopItemId) -> bool {
        let Some(root) = settings.install_dir.as_deref() else {
            return false;
        };
        match self.deps.library.scan(root).await {
            Ok(items) => items.iter().any(|item| item.id == item_id.as_str()),
            Err(e) => {
                warn!(target: "workdl.queue", error = %e, "Library scan failed, not skipping");
                false
            }
        }
    }
}
