//! Disk-based transfer sampling.
//!
//! SteamCMD's own progress output is sparse, so the supervisor also measures
//! the staging directories once per tick. Bytes already present when the fetch
//! started are subtracted, and speed is an exponentially weighted average of
//! the per-tick delta.

#![allow(clippy::cast_precision_loss)]

use std::path::{Path, PathBuf};
use std::time::Instant;

use tokio::task;
use walkdir::WalkDir;

use workdl_core::ProgressEvent;

/// Weight of the newest sample in the speed average.
const SPEED_SMOOTHING: f64 = 0.3;

/// Total size of regular files below `path`. Missing paths count as zero.
pub fn directory_size(path: &Path) -> u64 {
    if !path.exists() {
        return 0;
    }
    WalkDir::new(path)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.metadata().ok())
        .map(|meta| meta.len())
        .sum()
}

async fn measure(paths: Vec<PathBuf>) -> Vec<u64> {
    task::spawn_blocking(move || paths.iter().map(|p| directory_size(p)).collect())
        .await
        .unwrap_or_default()
}

/// Exponentially weighted bytes-per-second estimate.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SpeedMeter {
    current: f64,
    primed: bool,
}

impl SpeedMeter {
    /// Feed `bytes` observed over `secs`; returns the smoothed rate.
    pub fn observe(&mut self, bytes: u64, secs: f64) -> f64 {
        if secs <= 0.0 {
            return self.current;
        }
        let instant = bytes as f64 / secs;
        self.current = if self.primed {
            SPEED_SMOOTHING.mul_add(instant, (1.0 - SPEED_SMOOTHING) * self.current)
        } else {
            instant
        };
        self.primed = true;
        self.current
    }

    pub const fn current(&self) -> f64 {
        self.current
    }
}

/// Samples the content and download directories of one item.
#[derive(Debug)]
pub struct TransferSampler {
    content_dir: PathBuf,
    download_dir: PathBuf,
    content_baseline: u64,
    download_baseline: u64,
    last_total: u64,
    last_at: Instant,
    speed: SpeedMeter,
}

impl TransferSampler {
    /// Record the current directory sizes as the baseline.
    pub async fn start(content_dir: PathBuf, download_dir: PathBuf) -> Self {
        let sizes = measure(vec![content_dir.clone(), download_dir.clone()]).await;
        Self {
            content_baseline: sizes.first().copied().unwrap_or(0),
            download_baseline: sizes.get(1).copied().unwrap_or(0),
            content_dir,
            download_dir,
            last_total: 0,
            last_at: Instant::now(),
            speed: SpeedMeter::default(),
        }
    }

    /// Measure once. Returns a transfer event when any new bytes exist.
    pub async fn sample(&mut self) -> Option<ProgressEvent> {
        let sizes = measure(vec![self.content_dir.clone(), self.download_dir.clone()]).await;
        let content = sizes
            .first()
            .copied()
            .unwrap_or(0)
            .saturating_sub(self.content_baseline);
        let downloads = sizes
            .get(1)
            .copied()
            .unwrap_or(0)
            .saturating_sub(self.download_baseline);
        // Chunks move from downloads/ into content/, count whichever is larger
        let total = content.max(downloads);

        let now = Instant::now();
        let elapsed = now.duration_since(self.last_at).as_secs_f64();
        let delta = total.saturating_sub(self.last_total);
        let speed = self.speed.observe(delta, elapsed);
        self.last_at = now;
        self.last_total = self.last_total.max(total);

        (self.last_total > 0).then_some(ProgressEvent::Transfer {
            downloaded: self.last_total,
            total: None,
            bytes_per_sec: speed,
        })
    }

    /// New bytes in the content directory since the fetch started.
    pub async fn content_written(&self) -> u64 {
        measure(vec![self.content_dir.clone()])
            .await
            .first()
            .copied()
            .unwrap_or(0)
            .saturating_sub(self.content_baseline)
    }
}
