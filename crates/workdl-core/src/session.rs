//! Download session model: status, progress events and the polling snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::item::WorkshopItemId;

/// Status of the single download session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadStatus {
    /// No fetch running.
    #[default]
    Idle,
    /// Fetch tool launched, logging in or resolving the item.
    Preparing,
    /// Item content is being transferred.
    Downloading,
    /// Content is being copied into the game library.
    Installing,
    /// Installed successfully.
    Completed,
    /// Stopped on request.
    Stopped,
    /// Failed.
    Error,
}

impl DownloadStatus {
    /// String form used in logs and API payloads.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Preparing => "preparing",
            Self::Downloading => "downloading",
            Self::Installing => "installing",
            Self::Completed => "completed",
            Self::Stopped => "stopped",
            Self::Error => "error",
        }
    }

    /// Terminal states hold until the session is reset.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Stopped | Self::Error)
    }

    /// States in which a fetch is in flight.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        matches!(self, Self::Preparing | Self::Downloading | Self::Installing)
    }
}

impl std::fmt::Display for DownloadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Non-terminal phases a fetch moves through, in order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadPhase {
    Preparing,
    Downloading,
    Installing,
}

impl DownloadPhase {
    /// All phases in order.
    pub const ALL: [Self; 3] = [Self::Preparing, Self::Downloading, Self::Installing];

    /// Status a session is in while in this phase.
    #[must_use]
    pub const fn status(self) -> DownloadStatus {
        match self {
            Self::Preparing => DownloadStatus::Preparing,
            Self::Downloading => DownloadStatus::Downloading,
            Self::Installing => DownloadStatus::Installing,
        }
    }

    /// Phase corresponding to a running status.
    #[must_use]
    pub const fn from_status(status: DownloadStatus) -> Option<Self> {
        match status {
            DownloadStatus::Preparing => Some(Self::Preparing),
            DownloadStatus::Downloading => Some(Self::Downloading),
            DownloadStatus::Installing => Some(Self::Installing),
            _ => None,
        }
    }
}

/// Structured event derived from fetch tool output or the supervisor itself.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// The fetch entered a new phase.
    Phase { phase: DownloadPhase },
    /// Completion percentage reported by the tool (0..=100).
    Progress { percent: f64 },
    /// Byte counters and transfer rate.
    Transfer {
        downloaded: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        total: Option<u64>,
        bytes_per_sec: f64,
    },
    /// Size announced by the content platform before transfer starts.
    ExpectedSize { bytes: u64 },
    /// Display title of the item.
    Title { title: String },
    /// Informational status message.
    Message { message: String },
    /// Evidence that item content reached disk.
    ContentWritten { bytes: u64 },
    /// Fetch and installation finished successfully.
    Completed,
    /// Fetch or installation failed.
    Failed { reason: String },
    /// Fetch was stopped on request.
    Stopped,
}

/// Immutable point-in-time copy of the download session, returned to pollers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DownloadSessionView {
    /// Item being fetched, `None` when idle.
    pub item_id: Option<WorkshopItemId>,
    pub status: DownloadStatus,
    /// Completion percentage, non-decreasing within one session.
    pub progress: u8,
    /// Human-readable size (`"12.40 MB"`).
    pub file_size: String,
    /// Human-readable transfer rate (`"1.10 MB/s"`).
    pub speed: String,
    pub downloaded_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// True while a fetch is in flight.
    pub active: bool,
    /// Incremented on every session start; lets pollers tell sessions apart.
    pub generation: u64,
    pub updated_at: DateTime<Utc>,
}

impl DownloadSessionView {
    /// The idle session.
    #[must_use]
    pub fn idle(generation: u64) -> Self {
        Self {
            item_id: None,
            status: DownloadStatus::Idle,
            progress: 0,
            file_size: "0 B".to_string(),
            speed: "0 B/s".to_string(),
            downloaded_bytes: 0,
            total_bytes: None,
            title: None,
            message: None,
            active: false,
            generation,
            updated_at: Utc::now(),
        }
    }
}

impl Default for DownloadSessionView {
    fn default() -> Self {
        Self::idle(0)
    }
}
