//! Download status tracker.
//!
//! Holds the single download session behind a `watch` channel: writers apply
//! [`ProgressEvent`]s with `send_modify`, pollers take a cheap clone of the
//! latest value and never wait on a running fetch.
//!
//! # State machine
//!
//! `idle -> preparing -> downloading -> installing -> {completed | error}`,
//! any running state may go to `stopped` or `error`. Terminal states hold
//! until the next [`StatusTracker::begin`] or a reset. An event that implies a
//! later phase walks through every skipped phase, so observers always see the
//! full sequence.

// Percentages are clamped to 0..=100 before narrowing
#![allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tracing::debug;

use workdl_core::{
    DownloadPhase, DownloadSessionView, DownloadStatus, ProgressEvent, WorkshopItemId,
    format_bytes, format_speed,
};

/// Highest percentage shown while a fetch is still running.
const RUNNING_PROGRESS_CAP: f64 = 99.0;

/// Number of transitions kept for inspection.
const HISTORY_CAPACITY: usize = 64;

/// One observed status change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StatusTransition {
    pub generation: u64,
    pub item_id: Option<WorkshopItemId>,
    pub from: DownloadStatus,
    pub to: DownloadStatus,
    pub at: DateTime<Utc>,
}

/// Owner of the download session state.
pub struct StatusTracker {
    tx: watch::Sender<DownloadSessionView>,
    generation: AtomicU64,
    history: Mutex<VecDeque<StatusTransition>>,
}

impl Default for StatusTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusTracker {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(DownloadSessionView::idle(0));
        Self {
            tx,
            generation: AtomicU64::new(0),
            history: Mutex::new(VecDeque::with_capacity(HISTORY_CAPACITY)),
        }
    }

    /// Point-in-time copy of the session.
    pub fn snapshot(&self) -> DownloadSessionView {
        self.tx.borrow().clone()
    }

    /// Receiver notified on every change.
    pub fn subscribe(&self) -> watch::Receiver<DownloadSessionView> {
        self.tx.subscribe()
    }

    /// Start a new session for `item_id` in `preparing`. Returns its generation.
    ///
    /// Any previous terminal session is discarded.
    pub fn begin(&self, item_id: &WorkshopItemId) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let mut changes = Vec::new();
        self.tx.send_modify(|view| {
            if view.status != DownloadStatus::Idle {
                changes.push((view.status, DownloadStatus::Idle));
            }
            *view = DownloadSessionView::idle(generation);
            view.item_id = Some(item_id.clone());
            view.status = DownloadStatus::Preparing;
            view.active = true;
            view.message = Some("Starting download".to_string());
            changes.push((DownloadStatus::Idle, DownloadStatus::Preparing));
        });
        self.record(generation, Some(item_id), &changes);
        generation
    }

    /// Apply an event to the current session, whatever its generation.
    pub fn update(&self, event: &ProgressEvent) {
        let generation = self.tx.borrow().generation;
        self.update_for(generation, event);
    }

    /// Apply an event only if the session is still `generation`.
    ///
    /// Returns false when the event was stale.
    pub fn update_for(&self, generation: u64, event: &ProgressEvent) -> bool {
        let mut changes = Vec::new();
        let mut item_id = None;
        let mut current = false;
        self.tx.send_if_modified(|view| {
            if view.generation != generation {
                return false;
            }
            current = true;
            item_id.clone_from(&view.item_id);
            let modified = apply_event(view, event, &mut changes);
            if modified {
                view.updated_at = Utc::now();
            }
            modified
        });
        self.record(generation, item_id.as_ref(), &changes);
        current
    }

    /// Return to `idle` unconditionally.
    pub fn reset(&self) {
        let mut changes = Vec::new();
        let mut generation = 0;
        self.tx.send_modify(|view| {
            generation = view.generation;
            if view.status != DownloadStatus::Idle {
                changes.push((view.status, DownloadStatus::Idle));
            }
            *view = DownloadSessionView::idle(generation);
        });
        self.record(generation, None, &changes);
    }

    /// Return to `idle` only if session `generation` is still current and terminal.
    pub fn reset_if_terminal(&self, generation: u64) -> bool {
        let mut changes = Vec::new();
        let reset = self.tx.send_if_modified(|view| {
            if view.generation != generation || !view.status.is_terminal() {
                return false;
            }
            changes.push((view.status, DownloadStatus::Idle));
            *view = DownloadSessionView::idle(generation);
            true
        });
        self.record(generation, None, &changes);
        reset
    }

    /// Recent transitions, oldest first.
    pub fn transitions(&self) -> Vec<StatusTransition> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    fn record(
        &self,
        generation: u64,
        item_id: Option<&WorkshopItemId>,
        changes: &[(DownloadStatus, DownloadStatus)],
    ) {
        if changes.is_empty() {
            return;
        }
        let mut history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        for &(from, to) in changes {
            debug!(
                target: "workdl.download",
                generation,
                item_id = item_id.map_or("-", WorkshopItemId::as_str),
                %from,
                %to,
                "Session transition"
            );
            if history.len() == HISTORY_CAPACITY {
                history.pop_front();
            }
            history.push_back(StatusTransition {
                generation,
                item_id: item_id.cloned(),
                from,
                to,
                at: Utc::now(),
            });
        }
    }
}

/// Apply one event to a session view, collecting status changes.
///
/// Returns whether the view changed. Events on idle or terminal sessions are
/// ignored.
fn apply_event(
    view: &mut DownloadSessionView,
    event: &ProgressEvent,
    changes: &mut Vec<(DownloadStatus, DownloadStatus)>,
) -> bool {
    if !view.status.is_running() {
        debug!(target: "workdl.download", status = %view.status, ?event, "Ignoring event outside a running session");
        return false;
    }

    match event {
        ProgressEvent::Phase { phase } => advance_to(view, *phase, changes),
        ProgressEvent::Progress { percent } => {
            advance_to(view, DownloadPhase::Downloading, changes);
            raise_progress(view, *percent);
        }
        ProgressEvent::Transfer {
            downloaded,
            total,
            bytes_per_sec,
        } => {
            advance_to(view, DownloadPhase::Downloading, changes);
            view.downloaded_bytes = view.downloaded_bytes.max(*downloaded);
            if let Some(total) = total {
                view.total_bytes = Some(*total);
            }
            view.file_size = format_bytes(view.total_bytes.unwrap_or(view.downloaded_bytes));
            view.speed = format_speed(*bytes_per_sec);
            if let Some(total) = view.total_bytes.filter(|t| *t > 0) {
                raise_progress(view, ratio_percent(view.downloaded_bytes, total));
            }
        }
        ProgressEvent::ExpectedSize { bytes } => {
            if view.total_bytes.is_none() {
                view.total_bytes = Some(*bytes);
                view.file_size = format_bytes(*bytes);
            }
        }
        ProgressEvent::Title { title } => view.title = Some(title.clone()),
        ProgressEvent::Message { message } => view.message = Some(message.clone()),
        ProgressEvent::ContentWritten { bytes } => {
            view.downloaded_bytes = view.downloaded_bytes.max(*bytes);
            if view.total_bytes.is_none() {
                view.file_size = format_bytes(view.downloaded_bytes);
            }
        }
        ProgressEvent::Completed => {
            advance_to(view, DownloadPhase::Installing, changes);
            finish(view, DownloadStatus::Completed, "Download completed", changes);
            view.progress = 100;
        }
        ProgressEvent::Failed { reason } => {
            finish(view, DownloadStatus::Error, reason, changes);
        }
        ProgressEvent::Stopped => {
            finish(view, DownloadStatus::Stopped, "Download stopped", changes);
        }
    }
    true
}

/// Move forward to `target`, passing through every skipped phase.
fn advance_to(
    view: &mut DownloadSessionView,
    target: DownloadPhase,
    changes: &mut Vec<(DownloadStatus, DownloadStatus)>,
) {
    let Some(current) = DownloadPhase::from_status(view.status) else {
        return;
    };
    for phase in DownloadPhase::ALL {
        if phase > current && phase <= target {
            changes.push((view.status, phase.status()));
            view.status = phase.status();
        }
    }
}

fn finish(
    view: &mut DownloadSessionView,
    terminal: DownloadStatus,
    message: &str,
    changes: &mut Vec<(DownloadStatus, DownloadStatus)>,
) {
    changes.push((view.status, terminal));
    view.status = terminal;
    view.active = false;
    view.speed = format_speed(0.0);
    view.message = Some(message.to_string());
}

/// Raise the percentage, never lowering it and never reaching 100 while running.
fn raise_progress(view: &mut DownloadSessionView, percent: f64) {
    if !percent.is_finite() {
        return;
    }
    let capped = percent.clamp(0.0, RUNNING_PROGRESS_CAP).floor() as u8;
    view.progress = view.progress.max(capped);
}

#[allow(clippy::cast_precision_loss)]
fn ratio_percent(done: u64, total: u64) -> f64 {
    done as f64 * 100.0 / total as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> WorkshopItemId {
        WorkshopItemId::parse(s).unwrap()
    }

    fn statuses(tracker: &StatusTracker) -> Vec<DownloadStatus> {
        tracker.transitions().iter().map(|t| t.to).collect()
    }

    #[test]
    fn test_begin_enters_preparing() {
        let tracker = StatusTracker::new();
        let generation = tracker.begin(&id("1"));
        let view = tracker.snapshot();
        assert_eq!(generation, 1);
        assert_eq!(view.status, DownloadStatus::Preparing);
        assert!(view.active);
        assert_eq!(view.item_id, Some(id("1")));
    }

    #[test]
    fn test_full_lifecycle() {
        let tracker = StatusTracker::new();
        tracker.begin(&id("1"));
        tracker.update(&ProgressEvent::Phase {
            phase: DownloadPhase::Downloading,
        });
        tracker.update(&ProgressEvent::Phase {
            phase: DownloadPhase::Installing,
        });
        tracker.update(&ProgressEvent::Completed);

        let view = tracker.snapshot();
        assert_eq!(view.status, DownloadStatus::Completed);
        assert_eq!(view.progress, 100);
        assert!(!view.active);
        assert_eq!(
            statuses(&tracker),
            vec![
                DownloadStatus::Preparing,
                DownloadStatus::Downloading,
                DownloadStatus::Installing,
                DownloadStatus::Completed,
            ]
        );
    }

    #[test]
    fn test_skipped_phases_are_synthesized() {
        let tracker = StatusTracker::new();
        tracker.begin(&id("1"));
        tracker.update(&ProgressEvent::Phase {
            phase: DownloadPhase::Installing,
        });
        assert_eq!(
            statuses(&tracker),
            vec![
                DownloadStatus::Preparing,
                DownloadStatus::Downloading,
                DownloadStatus::Installing,
            ]
        );
    }

    #[test]
    fn test_completed_straight_from_preparing_walks_every_phase() {
        let tracker = StatusTracker::new();
        tracker.begin(&id("1"));
        tracker.update(&ProgressEvent::Completed);
        assert_eq!(
            statuses(&tracker),
            vec![
                DownloadStatus::Preparing,
                DownloadStatus::Downloading,
                DownloadStatus::Installing,
                DownloadStatus::Completed,
            ]
        );
    }

    #[test]
    fn test_progress_is_monotonic_and_capped() {
        let tracker = StatusTracker::new();
        tracker.begin(&id("1"));
        tracker.update(&ProgressEvent::Progress { percent: 40.0 });
        tracker.update(&ProgressEvent::Progress { percent: 10.0 });
        assert_eq!(tracker.snapshot().progress, 40);
        assert_eq!(tracker.snapshot().status, DownloadStatus::Downloading);

        tracker.update(&ProgressEvent::Progress { percent: 100.0 });
        assert_eq!(tracker.snapshot().progress, 99);
    }

    #[test]
    fn test_transfer_updates_size_speed_and_percent() {
        let tracker = StatusTracker::new();
        tracker.begin(&id("1"));
        tracker.update(&ProgressEvent::ExpectedSize { bytes: 2048 });
        tracker.update(&ProgressEvent::Transfer {
            downloaded: 1024,
            total: None,
            bytes_per_sec: 1024.0,
        });
        let view = tracker.snapshot();
        assert_eq!(view.file_size, "2.00 KB");
        assert_eq!(view.speed, "1.00 KB/s");
        assert_eq!(view.progress, 50);
    }

    #[test]
    fn test_terminal_state_ignores_further_events() {
        let tracker = StatusTracker::new();
        tracker.begin(&id("1"));
        tracker.update(&ProgressEvent::Stopped);
        tracker.update(&ProgressEvent::Completed);
        tracker.update(&ProgressEvent::Progress { percent: 80.0 });
        let view = tracker.snapshot();
        assert_eq!(view.status, DownloadStatus::Stopped);
        assert_eq!(view.progress, 0);
    }

    #[test]
    fn test_stale_generation_is_ignored() {
        let tracker = StatusTracker::new();
        let first = tracker.begin(&id("1"));
        tracker.update_for(first, &ProgressEvent::Failed {
            reason: "boom".into(),
        });
        let second = tracker.begin(&id("2"));

        assert!(!tracker.update_for(first, &ProgressEvent::Completed));
        assert!(!tracker.reset_if_terminal(first));
        let view = tracker.snapshot();
        assert_eq!(view.generation, second);
        assert_eq!(view.status, DownloadStatus::Preparing);
    }

    #[test]
    fn test_reset_if_terminal() {
        let tracker = StatusTracker::new();
        let generation = tracker.begin(&id("1"));
        assert!(!tracker.reset_if_terminal(generation));

        tracker.update(&ProgressEvent::Failed {
            reason: "exit code 1".into(),
        });
        assert_eq!(
            tracker.snapshot().message.as_deref(),
            Some("exit code 1")
        );
        assert!(tracker.reset_if_terminal(generation));
        let view = tracker.snapshot();
        assert_eq!(view.status, DownloadStatus::Idle);
        assert!(view.item_id.is_none());
    }

    #[test]
    fn test_events_on_idle_are_ignored() {
        let tracker = StatusTracker::new();
        tracker.update(&ProgressEvent::Phase {
            phase: DownloadPhase::Downloading,
        });
        assert_eq!(tracker.snapshot().status, DownloadStatus::Idle);
        assert!(tracker.transitions().is_empty());
    }

    #[tokio::test]
    async fn test_subscribers_see_changes() {
        let tracker = StatusTracker::new();
        let mut rx = tracker.subscribe();
        tracker.begin(&id("9"));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().status, DownloadStatus::Preparing);
    }
}
