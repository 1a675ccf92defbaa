//! Terminal output helpers: tables and the download progress display.

use std::io::{self, IsTerminal};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use workdl_core::{DownloadSessionView, DownloadStatus};

/// Truncate to `max_len` characters, adding "..." if needed.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

/// Print a horizontal separator line.
pub fn print_separator(width: usize) {
    println!("{}", "-".repeat(width));
}

/// Human label for a session status.
pub const fn status_label(status: DownloadStatus) -> &'static str {
    match status {
        DownloadStatus::Idle => "Idle",
        DownloadStatus::Preparing => "Preparing",
        DownloadStatus::Downloading => "Downloading",
        DownloadStatus::Installing => "Installing",
        DownloadStatus::Completed => "Completed",
        DownloadStatus::Stopped => "Stopped",
        DownloadStatus::Error => "Failed",
    }
}

// ============================================================================
// Session progress
// ============================================================================

/// Progress display for one download session.
///
/// Draws an indicatif bar on a terminal; otherwise prints a line whenever the
/// status changes.
pub struct SessionProgress {
    bar: Option<ProgressBar>,
    last_status: Option<DownloadStatus>,
}

impl SessionProgress {
    pub fn new(label: &str) -> Self {
        let bar = io::stdout().is_terminal().then(|| {
            let bar = ProgressBar::with_draw_target(Some(100), ProgressDrawTarget::stdout());
            bar.set_style(bar_style());
            bar.set_prefix(label.to_string());
            bar.enable_steady_tick(Duration::from_millis(120));
            bar
        });
        Self {
            bar,
            last_status: None,
        }
    }

    pub fn update(&mut self, view: &DownloadSessionView) {
        let status_changed = self.last_status != Some(view.status);
        self.last_status = Some(view.status);

        match &self.bar {
            Some(bar) => {
                bar.set_position(u64::from(view.progress));
                bar.set_message(describe(view));
            }
            None if status_changed => println!("{}", describe(view)),
            None => {}
        }
    }

    /// Clear the bar and print the final line.
    pub fn finish(self, view: &DownloadSessionView) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
        let label = view
            .title
            .as_deref()
            .or_else(|| view.item_id.as_ref().map(|id| id.as_str()))
            .unwrap_or("item");
        let marker = if view.status == DownloadStatus::Completed {
            "✓"
        } else {
            "✗"
        };
        match &view.message {
            Some(message) => println!("{marker} {label}: {message}"),
            None => println!("{marker} {label}: {}", status_label(view.status)),
        }
    }
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner} {prefix} [{bar:30.cyan/blue}] {pos:>3}% {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ")
}

fn describe(view: &DownloadSessionView) -> String {
    let mut parts = vec![status_label(view.status).to_string()];
    if let Some(title) = &view.title {
        parts.push(truncate_string(title, 32));
    }
    if view.status == DownloadStatus::Downloading {
        if !view.file_size.is_empty() {
            parts.push(view.file_size.clone());
        }
        if !view.speed.is_empty() {
            parts.push(view.speed.clone());
        }
    }
    parts.join(" · ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("Hello", 10), "Hello");
        assert_eq!(truncate_string("Hello World", 8), "Hello...");
        assert_eq!(truncate_string("Zombies – Der Riese", 10), "Zombies...");
    }

    #[test]
    fn test_describe_downloading() {
        let mut view = DownloadSessionView::idle(1);
        view.status = DownloadStatus::Downloading;
        view.title = Some("Castle".to_string());
        view.file_size = "10.00 MB".to_string();
        view.speed = "1.00 MB/s".to_string();
        assert_eq!(describe(&view), "Downloading · Castle · 10.00 MB · 1.00 MB/s");
    }
}
