//! Fetch tool output parser.
//!
//! Pure state machine: one output line plus the current [`ParserState`] gives
//! the next state and at most one [`ProgressEvent`]. No I/O, no clocks, so
//! every transition is testable without spawning a process.
//!
//! Unrecognised lines produce no event. New tool versions that add chatter do
//! not break parsing.

use std::sync::OnceLock;

use regex::Regex;

use workdl_core::{DownloadPhase, ProgressEvent};

/// What the parser has learned from the output so far.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParserState {
    /// Furthest phase announced by the tool.
    pub phase: Option<DownloadPhase>,
    /// Highest percentage seen.
    pub percent: f64,
    /// Bytes reported by the last progress line.
    pub downloaded: u64,
    pub total: Option<u64>,
    /// The tool reported writing the item to disk.
    pub content_written: bool,
    /// First failure the tool reported.
    pub failure: Option<String>,
}

struct Patterns {
    progress: Regex,
    success: Regex,
    failed: Regex,
    timeout: Regex,
    generic_error: Regex,
    downloading: Regex,
    preparing: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        progress: Regex::new(r"(?i)progress:\s*([0-9]+(?:\.[0-9]+)?)\s*\((\d+)\s*/\s*(\d+)\)")
            .expect("progress regex is valid"),
        success: Regex::new(r#"Success\.\s+Downloaded item (\d+) to "([^"]*)" \((\d+) bytes\)"#)
            .expect("success regex is valid"),
        failed: Regex::new(r"ERROR!\s+Download item (\d+) failed \(([^)]*)\)")
            .expect("failure regex is valid"),
        timeout: Regex::new(r"ERROR!\s+Timeout downloading item").expect("timeout regex is valid"),
        generic_error: Regex::new(r"^\s*ERROR!\s*(.*)$").expect("error regex is valid"),
        downloading: Regex::new(r"(?i)downloading item\s+\d+").expect("downloading regex is valid"),
        preparing: Regex::new(
            r"(?i)(logging in|loading steam api|waiting for (user info|client config)|connecting anonymously)",
        )
        .expect("preparing regex is valid"),
    })
}

/// Map one output line to the next state and an optional event.
pub fn parse_line(mut state: ParserState, line: &str) -> (ParserState, Option<ProgressEvent>) {
    let line = line.trim();
    if line.is_empty() {
        return (state, None);
    }
    let p = patterns();

    if let Some(caps) = p.success.captures(line) {
        let bytes = caps[3].parse().unwrap_or(0);
        state.content_written = true;
        state.downloaded = state.downloaded.max(bytes);
        return (state, Some(ProgressEvent::ContentWritten { bytes }));
    }

    if let Some(caps) = p.failed.captures(line) {
        let reason = caps[2].trim().to_string();
        let reason = if reason.is_empty() {
            "download failed".to_string()
        } else {
            reason
        };
        return fail(state, reason);
    }

    if p.timeout.is_match(line) {
        return fail(state, "timeout".to_string());
    }

    if let Some(caps) = p.generic_error.captures(line) {
        let reason = caps[1].trim().trim_end_matches('.').to_string();
        let reason = if reason.is_empty() {
            "fetch tool reported an error".to_string()
        } else {
            reason
        };
        return fail(state, reason);
    }

    if let Some(caps) = p.progress.captures(line) {
        let percent: f64 = caps[1].parse().unwrap_or(0.0);
        let downloaded: u64 = caps[2].parse().unwrap_or(0);
        let total: u64 = caps[3].parse().unwrap_or(0);
        state.downloaded = state.downloaded.max(downloaded);
        if total > 0 {
            state.total = Some(total);
        }
        let current = state.phase.unwrap_or(DownloadPhase::Preparing);
        state.phase = Some(current.max(DownloadPhase::Downloading));
        if percent > state.percent {
            state.percent = percent;
        }
        return (
            state.clone(),
            Some(ProgressEvent::Progress {
                percent: state.percent,
            }),
        );
    }

    if p.downloading.is_match(line) {
        return advance_phase(state, DownloadPhase::Downloading);
    }

    if p.preparing.is_match(line) {
        return advance_phase(state, DownloadPhase::Preparing);
    }

    (state, None)
}

fn fail(mut state: ParserState, reason: String) -> (ParserState, Option<ProgressEvent>) {
    if state.failure.is_none() {
        state.failure = Some(reason.clone());
    }
    (state, Some(ProgressEvent::Failed { reason }))
}

/// Phases only move forward; a repeated or earlier phase yields no event.
fn advance_phase(
    mut state: ParserState,
    phase: DownloadPhase,
) -> (ParserState, Option<ProgressEvent>) {
    match state.phase {
        Some(current) if current >= phase => (state, None),
        _ => {
            state.phase = Some(phase);
            (state, Some(ProgressEvent::Phase { phase }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(lines: &[&str]) -> (ParserState, Vec<ProgressEvent>) {
        let mut state = ParserState::default();
        let mut events = Vec::new();
        for line in lines {
            let (next, event) = parse_line(state, line);
            state = next;
            events.extend(event);
        }
        (state, events)
    }

    #[test]
    fn test_typical_session() {
        let (state, events) = feed(&[
            "Redirecting stderr to '/home/user/steamcmd/logs/stderr.txt'",
            "Logging in user 'anonymous' to Steam Public...OK",
            "Waiting for user info...OK",
            "Downloading item 2873415912 ...",
            "progress: 12.50 (1000 / 8000)",
            "progress: 50.00 (4000 / 8000)",
            r#"Success. Downloaded item 2873415912 to "/home/user/steamcmd/steamapps/workshop/content/311210/2873415912" (8000 bytes)"#,
        ]);

        assert_eq!(
            events,
            vec![
                ProgressEvent::Phase {
                    phase: DownloadPhase::Preparing
                },
                ProgressEvent::Phase {
                    phase: DownloadPhase::Downloading
                },
                ProgressEvent::Progress { percent: 12.5 },
                ProgressEvent::Progress { percent: 50.0 },
                ProgressEvent::ContentWritten { bytes: 8000 },
            ]
        );
        assert!(state.content_written);
        assert_eq!(state.total, Some(8000));
        assert!(state.failure.is_none());
    }

    #[test]
    fn test_unrecognised_lines_are_ignored() {
        let (state, events) = feed(&["Steam>", "Loading Steam API...", "", "   "]);
        // "Loading Steam API" is a preparing marker, the rest is noise
        assert_eq!(events.len(), 1);
        assert_eq!(state.phase, Some(DownloadPhase::Preparing));
    }

    #[test]
    fn test_progress_never_regresses_in_state() {
        let (state, events) = feed(&["progress: 60.00 (6 / 10)", "progress: 10.00 (1 / 10)"]);
        assert_eq!(state.percent, 60.0);
        assert_eq!(events[1], ProgressEvent::Progress { percent: 60.0 });
    }

    #[test]
    fn test_progress_implies_downloading_phase() {
        let (state, _) = feed(&["progress: 1.00 (1 / 100)", "Downloading item 5 ..."]);
        assert_eq!(state.phase, Some(DownloadPhase::Downloading));
    }

    #[test]
    fn test_failure_lines() {
        let (state, events) = feed(&["ERROR! Download item 42 failed (Failure)."]);
        assert_eq!(
            events,
            vec![ProgressEvent::Failed {
                reason: "Failure".to_string()
            }]
        );
        assert_eq!(state.failure.as_deref(), Some("Failure"));

        let (state, _) = feed(&["ERROR! Timeout downloading item 42"]);
        assert_eq!(state.failure.as_deref(), Some("timeout"));

        let (state, _) = feed(&["ERROR! Not logged on."]);
        assert_eq!(state.failure.as_deref(), Some("Not logged on"));
    }

    #[test]
    fn test_first_failure_is_kept() {
        let (state, events) = feed(&[
            "ERROR! Download item 1 failed (Access Denied).",
            "ERROR! Timeout downloading item 1",
        ]);
        assert_eq!(events.len(), 2);
        assert_eq!(state.failure.as_deref(), Some("Access Denied"));
    }
}
