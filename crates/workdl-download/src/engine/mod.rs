//! The download engine aggregate.
//!
//! [`DownloadEngine`] owns the status tracker, the supervisor, the queue and
//! handles to the library and settings ports. Adapters (HTTP, CLI) hold it in
//! an `Arc` and call its methods; there is no global state, so several engines
//! can coexist in one process.
//!
//! # Concurrency Model
//!
//! - Queue state sits behind a `std::sync::Mutex` that is never held across
//!   an await
//! - One background runner drains the queue; `runner_active` guards it
//! - Settings are loaded at the start of every operation
//! - A terminal session is reset to `idle` after `terminal_reset_grace`

mod launch;
mod runner;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use workdl_core::{
    CompatibilityMismatch, DownloadSessionView, DownloadStatus, EngineError, EngineEvent,
    EngineEventEmitter, EngineResult, FixReport, FixSelection, LibraryItem, LibraryPort,
    ProgressEvent, Settings, SettingsRepository, SettingsUpdate, WorkshopDetails,
    WorkshopDetailsPort, WorkshopItemId, extract_workshop_id, extract_workshop_ids,
    validate_settings,
};

use crate::queue::{DownloadQueue, EnqueueResult, QueueSnapshot};
use crate::supervisor::{
    DEFAULT_SAMPLE_INTERVAL, FetchOutcome, FetchRequest, Supervisor, SupervisorHandle,
};
use crate::tracker::{StatusTracker, StatusTransition};

pub use launch::{LaunchAck, game_executable_candidates};

/// How long a terminal session stays visible before returning to `idle`.
pub const DEFAULT_TERMINAL_RESET_GRACE: Duration = Duration::from_secs(30);

/// Ports the engine depends on.
#[derive(Clone)]
pub struct EngineDeps {
    pub settings: Arc<dyn SettingsRepository>,
    pub library: Arc<dyn LibraryPort>,
    pub details: Arc<dyn WorkshopDetailsPort>,
    pub events: Arc<dyn EngineEventEmitter>,
}

/// Engine tuning.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub terminal_reset_grace: Duration,
    /// Period of the staging directory sampler.
    pub sample_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            terminal_reset_grace: DEFAULT_TERMINAL_RESET_GRACE,
            sample_interval: DEFAULT_SAMPLE_INTERVAL,
        }
    }
}

/// Acknowledgement of a started download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StartAck {
    pub item_id: WorkshopItemId,
    pub generation: u64,
}

/// Acknowledgement of a started queue run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessAck {
    pub pending: usize,
    pub continuous: bool,
}

/// Remote details combined with local install state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkshopInfo {
    pub id: WorkshopItemId,
    pub details: Option<WorkshopDetails>,
    pub installed: Option<LibraryItem>,
}

/// Orchestrates downloads, the queue and the library.
pub struct DownloadEngine {
    deps: EngineDeps,
    config: EngineConfig,
    tracker: Arc<StatusTracker>,
    supervisor: Arc<Supervisor>,
    queue: Mutex<DownloadQueue>,
    runner_active: AtomicBool,
    runner_cancel: Mutex<CancellationToken>,
}

impl DownloadEngine {
    pub fn new(deps: EngineDeps, config: EngineConfig) -> Self {
        let tracker = Arc::new(StatusTracker::new());
        let supervisor = Arc::new(Supervisor::with_sample_interval(
            Arc::clone(&tracker),
            config.sample_interval,
        ));
        Self {
            deps,
            config,
            tracker,
            supervisor,
            queue: Mutex::new(DownloadQueue::new()),
            runner_active: AtomicBool::new(false),
            runner_cancel: Mutex::new(CancellationToken::new()),
        }
    }

    // =========================================================================
    // Single download
    // =========================================================================

    /// Start fetching one item from an id or workshop link.
    ///
    /// # Errors
    ///
    /// - `Validation` if no id can be extracted or settings are incomplete
    /// - `AlreadyRunning` if a fetch or the queue runner is active
    /// - `SpawnFailure` if the fetch tool cannot be launched
    pub async fn start_download(self: &Arc<Self>, input: &str) -> EngineResult<StartAck> {
        let item_id = extract_workshop_id(input)
            .ok_or_else(|| EngineError::validation("no workshop item id found in input"))?;

        if let Some(active) = self.busy_with() {
            return Err(EngineError::AlreadyRunning { active });
        }

        let settings = self.load_settings().await?;
        let request = FetchRequest::from_settings(item_id.clone(), &settings)?;
        let handle = match self.supervisor.start(request) {
            Ok(handle) => handle,
            Err(e) => {
                if matches!(e, EngineError::SpawnFailure(_)) {
                    self.announce_spawn_failure(&item_id, &e);
                }
                return Err(e);
            }
        };
        let generation = handle.generation();
        self.announce_start(&handle);

        let engine = Arc::clone(self);
        tokio::spawn(async move {
            let outcome = handle.wait().await;
            engine.finalize(&outcome).await;
        });

        Ok(StartAck {
            item_id,
            generation,
        })
    }

    /// Stop the running fetch and the queue runner.
    ///
    /// Returns false when nothing was running. Once installation has begun the
    /// copy runs to completion, so `true` does not promise a `stopped` session.
    pub fn stop(&self) -> bool {
        let runner = self.runner_active.load(Ordering::SeqCst);
        if runner {
            self.lock_runner_cancel().cancel();
        }
        let fetch = self.supervisor.stop();
        info!(target: "workdl.download", runner, fetch, "Stop");
        runner || fetch
    }

    /// Latest session snapshot. Never waits on a running fetch.
    pub fn status(&self) -> DownloadSessionView {
        self.tracker.snapshot()
    }

    /// Receiver notified on every session change.
    pub fn subscribe_status(&self) -> watch::Receiver<DownloadSessionView> {
        self.tracker.subscribe()
    }

    /// Recent session transitions, oldest first.
    pub fn recent_transitions(&self) -> Vec<StatusTransition> {
        self.tracker.transitions()
    }

    /// Whether a fetch or a queue run is in progress.
    pub fn is_busy(&self) -> bool {
        self.busy_with().is_some()
    }

    fn busy_with(&self) -> Option<String> {
        if let Some(item) = self.supervisor.active_item() {
            return Some(item.to_string());
        }
        if self.runner_active.load(Ordering::SeqCst) {
            let processing = self.lock_queue().snapshot().processing;
            return Some(processing.map_or_else(|| "queue".to_string(), |id| id.to_string()));
        }
        None
    }

    // =========================================================================
    // Queue
    // =========================================================================

    /// Add every id found in free-form text. Duplicates are reported, not added.
    pub fn enqueue_text(&self, text: &str) -> EngineResult<EnqueueResult> {
        let ids = extract_workshop_ids(text)?;
        let result = self.lock_queue().enqueue(ids);
        info!(
            target: "workdl.queue",
            added = result.added.len(),
            duplicates = result.duplicates.len(),
            "Enqueued items"
        );
        if !result.added.is_empty() {
            self.emit_queue_changed();
        }
        Ok(result)
    }

    /// Remove one pending entry. Returns false when it was not queued.
    pub fn remove_from_queue(&self, input: &str) -> EngineResult<bool> {
        let id = extract_workshop_id(input)
            .ok_or_else(|| EngineError::validation("no workshop item id found in input"))?;
        let removed = self.lock_queue().remove(&id);
        if removed {
            debug!(target: "workdl.queue", item_id = %id, "Removed from queue");
            self.emit_queue_changed();
        }
        Ok(removed)
    }

    /// Drop every pending entry. An in-flight fetch continues.
    pub fn clear_queue(&self) -> usize {
        let cleared = self.lock_queue().clear();
        info!(target: "workdl.queue", cleared, "Queue cleared");
        self.emit_queue_changed();
        cleared
    }

    pub fn queue_snapshot(&self) -> QueueSnapshot {
        self.lock_queue().snapshot()
    }

    /// Start draining the queue in the background.
    ///
    /// # Errors
    ///
    /// - `Validation` if the queue is empty or settings are incomplete
    /// - `AlreadyRunning` if a fetch or queue run is active
    pub async fn process_queue(self: &Arc<Self>) -> EngineResult<ProcessAck> {
        let pending = self.lock_queue().len();
        if pending == 0 {
            return Err(EngineError::validation("queue is empty"));
        }
        if let Some(active) = self.busy_with() {
            return Err(EngineError::AlreadyRunning { active });
        }
        let settings = self.load_settings().await?;
        settings.require_install_dir()?;
        settings.require_fetch_tool()?;

        if self
            .runner_active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(EngineError::AlreadyRunning {
                active: "queue".to_string(),
            });
        }

        let cancel = CancellationToken::new();
        *self.lock_runner_cancel() = cancel.clone();

        info!(target: "workdl.queue", pending, continuous = settings.continuous_download, "Queue run started");
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            engine.run_queue(cancel).await;
        });

        Ok(ProcessAck {
            pending,
            continuous: settings.continuous_download,
        })
    }

    // =========================================================================
    // Library
    // =========================================================================

    /// Scan the install directory and return every item.
    pub async fn library_items(&self) -> EngineResult<Vec<LibraryItem>> {
        let root = self.install_root().await?;
        let items = self.deps.library.scan(&root).await?;
        self.deps.events.emit(EngineEvent::LibraryChanged { count: items.len() });
        Ok(items)
    }

    /// Delete an installed item by workshop id, link or folder name.
    pub async fn remove_library_item(&self, input: &str) -> EngineResult<LibraryItem> {
        let key = extract_workshop_id(input).map_or_else(|| input.trim().to_string(), String::from);
        if key.is_empty() {
            return Err(EngineError::validation("item id must not be empty"));
        }
        let root = self.install_root().await?;
        let removed = self.deps.library.remove(&root, &key).await?;
        let count = self.deps.library.cached().await.len();
        self.deps.events.emit(EngineEvent::LibraryChanged { count });
        Ok(removed)
    }

    pub async fn mismatches(&self) -> EngineResult<Vec<CompatibilityMismatch>> {
        let root = self.install_root().await?;
        self.deps.library.mismatches(&root).await
    }

    /// Rename mismatched folders to the expected names.
    pub async fn fix_compatibility(&self, selection: &FixSelection) -> EngineResult<FixReport> {
        let root = self.install_root().await?;
        let report = self.deps.library.fix(&root, selection).await?;
        let count = self.deps.library.cached().await.len();
        self.deps.events.emit(EngineEvent::LibraryChanged { count });
        Ok(report)
    }

    // =========================================================================
    // Settings and details
    // =========================================================================

    pub async fn settings(&self) -> EngineResult<Settings> {
        self.load_settings().await
    }

    /// Merge, validate and persist a settings update.
    pub async fn update_settings(&self, update: &SettingsUpdate) -> EngineResult<Settings> {
        let mut settings = self.load_settings().await?;
        settings.merge(update);
        validate_settings(&settings)?;
        self.deps.settings.save(&settings).await?;
        info!(target: "workdl.download", "Settings updated");
        Ok(settings)
    }

    /// Remote details for an item plus its install state.
    pub async fn workshop_info(&self, input: &str) -> EngineResult<WorkshopInfo> {
        let id = extract_workshop_id(input)
            .ok_or_else(|| EngineError::validation("no workshop item id found in input"))?;
        let details = self
            .deps
            .details
            .fetch_details(&id)
            .await
            .map_err(|e| EngineError::Internal(e.to_string()))?;
        let installed = self
            .deps
            .library
            .cached()
            .await
            .into_iter()
            .find(|item| item.id == id.as_str());
        Ok(WorkshopInfo {
            id,
            details,
            installed,
        })
    }

    // =========================================================================
    // Internals
    // =========================================================================

    async fn load_settings(&self) -> EngineResult<Settings> {
        Ok(self.deps.settings.load().await?)
    }

    async fn install_root(&self) -> EngineResult<PathBuf> {
        let settings = self.load_settings().await?;
        Ok(settings.require_install_dir()?.to_path_buf())
    }

    fn lock_queue(&self) -> MutexGuard<'_, DownloadQueue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_runner_cancel(&self) -> MutexGuard<'_, CancellationToken> {
        self.runner_cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn emit_queue_changed(&self) {
        let items = self.lock_queue().snapshot().items;
        self.deps.events.emit(EngineEvent::QueueChanged { items });
    }

    /// Emit the start event and annotate the session with remote details.
    fn announce_start(&self, handle: &SupervisorHandle) {
        let item_id = handle.item_id().clone();
        let generation = handle.generation();
        self.deps.events.emit(EngineEvent::DownloadStarted {
            item_id: item_id.clone(),
        });

        let details = Arc::clone(&self.deps.details);
        let tracker = Arc::clone(&self.tracker);
        tokio::spawn(async move {
            match details.fetch_details(&item_id).await {
                Ok(Some(found)) => {
                    tracker.update_for(generation, &ProgressEvent::Title { title: found.title });
                    if let Some(bytes) = found.file_size.filter(|b| *b > 0) {
                        tracker.update_for(generation, &ProgressEvent::ExpectedSize { bytes });
                    }
                }
                Ok(None) => {
                    debug!(target: "workdl.steam", item_id = %item_id, "No remote details for item");
                }
                Err(e) => {
                    warn!(target: "workdl.steam", item_id = %item_id, error = %e, "Details lookup failed");
                }
            }
        });
    }

    /// Report a spawn failure and let the error session expire.
    fn announce_spawn_failure(&self, item_id: &WorkshopItemId, error: &EngineError) {
        self.deps.events.emit(EngineEvent::DownloadFinished {
            item_id: item_id.clone(),
            status: DownloadStatus::Error,
            message: Some(error.user_message()),
        });
        self.schedule_reset(self.tracker.snapshot().generation);
    }

    /// Post-fetch bookkeeping: event, library refresh, delayed reset.
    async fn finalize(&self, outcome: &FetchOutcome) {
        self.deps.events.emit(EngineEvent::DownloadFinished {
            item_id: outcome.item_id.clone(),
            status: outcome.status,
            message: Some(outcome.message.clone()),
        });

        if outcome.status == DownloadStatus::Completed {
            match self.install_root().await {
                Ok(root) => match self.deps.library.scan(&root).await {
                    Ok(items) => {
                        self.deps.events.emit(EngineEvent::LibraryChanged { count: items.len() });
                    }
                    Err(e) => {
                        warn!(target: "workdl.library", error = %e, "Library rescan after download failed");
                    }
                },
                Err(e) => {
                    warn!(target: "workdl.library", error = %e, "Cannot rescan library");
                }
            }
        }

        self.schedule_reset(outcome.generation);
    }

    fn schedule_reset(&self, generation: u64) {
        let tracker = Arc::clone(&self.tracker);
        let grace = self.config.terminal_reset_grace;
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            if tracker.reset_if_terminal(generation) {
                debug!(target: "workdl.download", generation, "Session reset to idle");
            }
        });
    }
}
