//! Process supervisor for the fetch tool.
//!
//! Runs one fetch subprocess at a time and turns what it observes (output
//! lines, staging directory growth, exit status) into [`ProgressEvent`]s for
//! the [`StatusTracker`].
//!
//! # Concurrency Model
//!
//! - The `active` slot is a lease: whoever fills it owns the tracker session
//!   for that generation
//! - The slot is held across the synchronous spawn only, never across an await
//! - Stop requests go through a `CancellationToken`; the run loop reacts by
//!   escalating SIGTERM to SIGKILL after the grace period
//! - The slot is cleared before the outcome is delivered, so a waiter can
//!   start the next fetch immediately

mod command;
mod outcome;
mod sampler;
mod shutdown;
mod stream;

use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::process::Child;
use tokio::sync::{mpsc, oneshot};
use tokio::task;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use workdl_core::{
    DownloadPhase, DownloadStatus, EngineError, EngineResult, ProgressEvent, Settings,
    WorkshopItemId,
};

use crate::install::{InstalledItem, install_item};
use crate::parser::{ParserState, parse_line};
use crate::tracker::StatusTracker;

pub use command::{
    FetchCommand, STAGING_DIR_NAME, StagingLayout, default_staging_root, describe_spawn_error,
    resolve_fetch_tool,
};
pub use outcome::{
    DIAGNOSTIC_LINES, DiagnosticTail, ExitFacts, ExitKind, FetchVerdict, classify_exit,
    sanitize_diagnostic,
};
pub use sampler::{SpeedMeter, TransferSampler, directory_size};
pub use shutdown::shutdown_child;

/// Default period of the staging directory sampler.
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_secs(1);

/// Output lines buffered between the readers and the run loop.
const LINE_BUFFER: usize = 256;

/// How long trailing output is drained after the process exits.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

// =============================================================================
// Requests and outcomes
// =============================================================================

/// Everything needed to fetch and install one item.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub item_id: WorkshopItemId,
    /// Resolved fetch tool executable.
    pub tool: PathBuf,
    pub staging_root: PathBuf,
    pub install_root: PathBuf,
    pub timeout: Duration,
    pub stop_grace: Duration,
    pub clean_on_finish: bool,
}

impl FetchRequest {
    /// Build a request from the current settings.
    ///
    /// Fails with a validation error when the install directory or fetch tool
    /// is not configured, or the install directory does not exist.
    pub fn from_settings(item_id: WorkshopItemId, settings: &Settings) -> EngineResult<Self> {
        let install_root = settings.require_install_dir()?.to_path_buf();
        if !install_root.is_dir() {
            return Err(EngineError::validation(
                "installation directory does not exist",
            ));
        }
        let tool = resolve_fetch_tool(settings.require_fetch_tool()?);
        Ok(Self {
            staging_root: default_staging_root(&tool),
            item_id,
            tool,
            install_root,
            timeout: settings.fetch_timeout(),
            stop_grace: settings.stop_grace(),
            clean_on_finish: settings.clean_on_finish,
        })
    }
}

/// Final result of one supervised fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchOutcome {
    pub item_id: WorkshopItemId,
    pub generation: u64,
    /// `Completed`, `Stopped` or `Error`.
    pub status: DownloadStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installed: Option<InstalledItem>,
}

/// Handle to a running fetch.
#[derive(Debug)]
pub struct SupervisorHandle {
    item_id: WorkshopItemId,
    generation: u64,
    rx: oneshot::Receiver<FetchOutcome>,
}

impl SupervisorHandle {
    pub const fn item_id(&self) -> &WorkshopItemId {
        &self.item_id
    }

    /// Tracker session generation owned by this fetch.
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Wait for the fetch to reach a terminal state.
    pub async fn wait(self) -> FetchOutcome {
        let Self {
            item_id,
            generation,
            rx,
        } = self;
        rx.await.unwrap_or_else(|_| FetchOutcome {
            item_id,
            generation,
            status: DownloadStatus::Error,
            message: "supervisor task ended unexpectedly".to_string(),
            installed: None,
        })
    }
}

struct ActiveFetch {
    item_id: WorkshopItemId,
    generation: u64,
    cancel: CancellationToken,
}

/// How the wait on the process ended.
enum ProcessEnd {
    Exited(io::Result<ExitStatus>),
    Stopped,
    TimedOut,
}

// =============================================================================
// Supervisor
// =============================================================================

/// Launches and monitors the fetch tool, one item at a time.
pub struct Supervisor {
    tracker: Arc<StatusTracker>,
    active: Mutex<Option<ActiveFetch>>,
    sample_interval: Duration,
}

impl Supervisor {
    pub fn new(tracker: Arc<StatusTracker>) -> Self {
        Self::with_sample_interval(tracker, DEFAULT_SAMPLE_INTERVAL)
    }

    pub fn with_sample_interval(tracker: Arc<StatusTracker>, sample_interval: Duration) -> Self {
        Self {
            tracker,
            active: Mutex::new(None),
            sample_interval,
        }
    }

    pub fn tracker(&self) -> &Arc<StatusTracker> {
        &self.tracker
    }

    /// Whether a fetch is running.
    pub fn is_active(&self) -> bool {
        self.lock_active().is_some()
    }

    /// Item currently being fetched.
    pub fn active_item(&self) -> Option<WorkshopItemId> {
        self.lock_active().as_ref().map(|a| a.item_id.clone())
    }

    /// Launch the fetch tool for `request.item_id`.
    ///
    /// # Errors
    ///
    /// - `AlreadyRunning` if another fetch is active; its session is untouched
    /// - `SpawnFailure` if the tool cannot be launched; the session ends in `error`
    pub fn start(self: &Arc<Self>, request: FetchRequest) -> EngineResult<SupervisorHandle> {
        let mut active = self.lock_active();
        if let Some(current) = active.as_ref() {
            return Err(EngineError::AlreadyRunning {
                active: current.item_id.to_string(),
            });
        }

        let generation = self.tracker.begin(&request.item_id);
        let child = std::fs::create_dir_all(&request.staging_root)
            .and_then(|()| {
                FetchCommand::new(&request.tool, &request.staging_root, &request.item_id).spawn()
            });
        let child = match child {
            Ok(child) => child,
            Err(e) => {
                let reason = describe_spawn_error(&e);
                warn!(
                    target: "workdl.download",
                    item_id = %request.item_id,
                    error = %e,
                    "Failed to launch fetch tool"
                );
                self.tracker.update_for(
                    generation,
                    &ProgressEvent::Failed {
                        reason: reason.clone(),
                    },
                );
                return Err(EngineError::SpawnFailure(reason));
            }
        };

        info!(
            target: "workdl.download",
            item_id = %request.item_id,
            generation,
            pid = child.id(),
            "Fetch tool started"
        );

        let cancel = CancellationToken::new();
        *active = Some(ActiveFetch {
            item_id: request.item_id.clone(),
            generation,
            cancel: cancel.clone(),
        });
        drop(active);

        let (tx, rx) = oneshot::channel();
        let handle = SupervisorHandle {
            item_id: request.item_id.clone(),
            generation,
            rx,
        };
        let supervisor = Arc::clone(self);
        tokio::spawn(async move {
            let outcome = supervisor.run(child, request, generation, cancel).await;
            supervisor.release(generation);
            let _ = tx.send(outcome);
        });
        Ok(handle)
    }

    /// Request the running fetch to stop. Returns false when nothing runs.
    pub fn stop(&self) -> bool {
        let active = self.lock_active();
        let Some(current) = active.as_ref() else {
            return false;
        };
        info!(target: "workdl.download", item_id = %current.item_id, "Stop requested");
        current.cancel.cancel();
        true
    }

    fn lock_active(&self) -> std::sync::MutexGuard<'_, Option<ActiveFetch>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Clear the active slot if it still belongs to `generation`.
    fn release(&self, generation: u64) {
        let mut active = self.lock_active();
        if active.as_ref().is_some_and(|a| a.generation == generation) {
            *active = None;
        }
    }

    // =========================================================================
    // Run loop
    // =========================================================================

    async fn run(
        &self,
        mut child: Child,
        request: FetchRequest,
        generation: u64,
        cancel: CancellationToken,
    ) -> FetchOutcome {
        let (line_tx, mut line_rx) = mpsc::channel::<String>(LINE_BUFFER);
        if let Some(stdout) = child.stdout.take() {
            stream::spawn_line_reader(stdout, "stdout", line_tx.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            stream::spawn_line_reader(stderr, "stderr", line_tx.clone());
        }
        drop(line_tx);

        let layout = StagingLayout::new(&request.staging_root);
        let mut sampler = TransferSampler::start(
            layout.content_dir(&request.item_id),
            layout.download_dir(&request.item_id),
        )
        .await;
        let mut ticker = time::interval(self.sample_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker.tick().await;

        let deadline = time::sleep(request.timeout);
        tokio::pin!(deadline);

        let mut lines = LineHandler::new(generation);
        let mut lines_open = true;

        let end = loop {
            tokio::select! {
                biased;

                () = cancel.cancelled() => {
                    self.terminate(&mut child, &request, "stop requested").await;
                    break ProcessEnd::Stopped;
                }
                () = &mut deadline => {
                    self.terminate(&mut child, &request, "timed out").await;
                    break ProcessEnd::TimedOut;
                }
                status = child.wait() => break ProcessEnd::Exited(status),
                line = line_rx.recv(), if lines_open => match line {
                    Some(line) => lines.handle(&self.tracker, &line),
                    None => lines_open = false,
                },
                _ = ticker.tick() => {
                    if let Some(event) = sampler.sample().await {
                        self.tracker.update_for(generation, &event);
                    }
                }
            }
        };

        // Output written just before exit may still be buffered
        let drain_until = Instant::now() + DRAIN_TIMEOUT;
        while lines_open {
            match time::timeout_at(drain_until, line_rx.recv()).await {
                Ok(Some(line)) => lines.handle(&self.tracker, &line),
                Ok(None) | Err(_) => lines_open = false,
            }
        }

        let exit = match end {
            ProcessEnd::Stopped => ExitKind::Killed,
            ProcessEnd::TimedOut => ExitKind::TimedOut(request.timeout),
            ProcessEnd::Exited(Ok(status)) => status.code().map_or(ExitKind::Signaled, ExitKind::Code),
            ProcessEnd::Exited(Err(e)) => ExitKind::WaitFailed(e.kind().to_string()),
        };
        let content_written =
            lines.state.content_written || sampler.content_written().await > 0;
        let facts = ExitFacts {
            exit,
            stop_requested: cancel.is_cancelled(),
            content_written,
            failure: lines.state.failure.clone(),
            diagnostic: lines.tail.last_meaningful(),
        };
        debug!(target: "workdl.download", item_id = %request.item_id, ?facts, "Fetch tool finished");

        match classify_exit(&facts) {
            FetchVerdict::Stopped => {
                self.tracker.update_for(generation, &ProgressEvent::Stopped);
                self.outcome(&request, generation, DownloadStatus::Stopped, "Download stopped", None)
            }
            FetchVerdict::Failed(reason) => {
                warn!(target: "workdl.download", item_id = %request.item_id, %reason, "Fetch failed");
                self.tracker.update_for(
                    generation,
                    &ProgressEvent::Failed {
                        reason: reason.clone(),
                    },
                );
                self.outcome(&request, generation, DownloadStatus::Error, &reason, None)
            }
            FetchVerdict::Fetched => self.install(&request, generation, layout).await,
        }
    }

    async fn terminate(&self, child: &mut Child, request: &FetchRequest, why: &str) {
        info!(target: "workdl.download", item_id = %request.item_id, reason = why, "Terminating fetch tool");
        if let Err(e) = shutdown_child(child, request.stop_grace).await {
            warn!(target: "workdl.download", item_id = %request.item_id, error = %e, "Failed to terminate fetch tool");
        }
    }

    async fn install(
        &self,
        request: &FetchRequest,
        generation: u64,
        layout: StagingLayout,
    ) -> FetchOutcome {
        self.tracker.update_for(
            generation,
            &ProgressEvent::Phase {
                phase: DownloadPhase::Installing,
            },
        );
        self.tracker.update_for(
            generation,
            &ProgressEvent::Message {
                message: "Installing into game folder".to_string(),
            },
        );

        let item_id = request.item_id.clone();
        let install_root = request.install_root.clone();
        let clean = request.clean_on_finish;
        let result = task::spawn_blocking(move || {
            install_item(&item_id, &layout, &install_root, clean)
        })
        .await;

        match result {
            Ok(Ok(installed)) => {
                self.tracker.update_for(generation, &ProgressEvent::Completed);
                self.outcome(
                    request,
                    generation,
                    DownloadStatus::Completed,
                    "Download completed",
                    Some(installed),
                )
            }
            Ok(Err(e)) => {
                let reason = format!("installation failed: {e}");
                warn!(target: "workdl.download", item_id = %request.item_id, %reason, "Install failed");
                self.tracker.update_for(
                    generation,
                    &ProgressEvent::Failed {
                        reason: reason.clone(),
                    },
                );
                self.outcome(request, generation, DownloadStatus::Error, &reason, None)
            }
            Err(join) => {
                let reason = format!("installation task failed: {join}");
                self.tracker.update_for(
                    generation,
                    &ProgressEvent::Failed {
                        reason: reason.clone(),
                    },
                );
                self.outcome(request, generation, DownloadStatus::Error, &reason, None)
            }
        }
    }

    fn outcome(
        &self,
        request: &FetchRequest,
        generation: u64,
        status: DownloadStatus,
        message: &str,
        installed: Option<InstalledItem>,
    ) -> FetchOutcome {
        info!(
            target: "workdl.download",
            item_id = %request.item_id,
            generation,
            %status,
            "Fetch finished"
        );
        FetchOutcome {
            item_id: request.item_id.clone(),
            generation,
            status,
            message: message.to_string(),
            installed,
        }
    }
}

/// Feeds output lines through the parser into the tracker.
struct LineHandler {
    generation: u64,
    state: ParserState,
    tail: DiagnosticTail,
}

impl LineHandler {
    fn new(generation: u64) -> Self {
        Self {
            generation,
            state: ParserState::default(),
            tail: DiagnosticTail::new(DIAGNOSTIC_LINES),
        }
    }

    fn handle(&mut self, tracker: &StatusTracker, line: &str) {
        self.tail.push(line);
        let (next, event) = parse_line(std::mem::take(&mut self.state), line);
        self.state = next;
        let Some(event) = event else {
            return;
        };
        // Failures are decided at exit; while running they are only shown
        let event = match event {
            ProgressEvent::Failed { reason } => ProgressEvent::Message {
                message: sanitize_diagnostic(&reason),
            },
            other => other,
        };
        tracker.update_for(self.generation, &event);
    }
}
