//! Exit classification.
//!
//! After the fetch tool exits, the supervisor reduces what it observed into
//! [`ExitFacts`] and [`classify_exit`] decides the result. Kept pure so the
//! precedence between stop requests, timeouts, parsed failures and exit codes
//! is tested without processes.

use std::collections::VecDeque;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;

/// Number of output lines kept for diagnostics.
pub const DIAGNOSTIC_LINES: usize = 20;

/// Longest diagnostic excerpt surfaced to callers.
const MAX_DIAGNOSTIC_CHARS: usize = 200;

/// How the process ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitKind {
    /// Exited on its own with a code.
    Code(i32),
    /// Terminated by a signal without a stop request.
    Signaled,
    /// Stopped by the supervisor on request.
    Killed,
    /// Exceeded the configured time limit.
    TimedOut(Duration),
    /// Waiting on the process failed.
    WaitFailed(String),
}

/// Everything the classifier needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitFacts {
    pub exit: ExitKind,
    pub stop_requested: bool,
    /// Output or disk evidence that the item reached the content directory.
    pub content_written: bool,
    /// First failure parsed from the output.
    pub failure: Option<String>,
    /// Sanitized last meaningful output line.
    pub diagnostic: Option<String>,
}

/// Result of a fetch before installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchVerdict {
    /// Content is in staging and ready to install.
    Fetched,
    Stopped,
    Failed(String),
}

/// Decide the fetch result. First matching rule wins:
///
/// 1. a stop request gives `Stopped`
/// 2. a timeout fails
/// 3. a failure reported in the output fails
/// 4. exit code 0 with content gives `Fetched`
/// 5. exit code 0 without content fails
/// 6. any other exit fails with the code and diagnostic
pub fn classify_exit(facts: &ExitFacts) -> FetchVerdict {
    if facts.stop_requested {
        return FetchVerdict::Stopped;
    }
    match (&facts.exit, &facts.failure) {
        (ExitKind::TimedOut(limit), _) => {
            FetchVerdict::Failed(format!("fetch tool timed out after {}s", limit.as_secs()))
        }
        (_, Some(reason)) => {
            FetchVerdict::Failed(format!("download failed: {}", sanitize_diagnostic(reason)))
        }
        (ExitKind::Code(0), None) if facts.content_written => FetchVerdict::Fetched,
        (ExitKind::Code(0), None) => {
            FetchVerdict::Failed("no output produced by fetch tool".to_string())
        }
        (ExitKind::Code(code), None) => FetchVerdict::Failed(with_diagnostic(
            format!("fetch tool exited with code {code}"),
            facts.diagnostic.as_deref(),
        )),
        (ExitKind::Signaled | ExitKind::Killed, None) => FetchVerdict::Failed(with_diagnostic(
            "fetch tool was terminated".to_string(),
            facts.diagnostic.as_deref(),
        )),
        (ExitKind::WaitFailed(reason), None) => {
            FetchVerdict::Failed(format!("lost track of fetch tool: {reason}"))
        }
    }
}

fn with_diagnostic(base: String, diagnostic: Option<&str>) -> String {
    match diagnostic {
        Some(line) if !line.is_empty() => format!("{base}: {line}"),
        _ => base,
    }
}

fn path_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(^|[\s"'(=])((?:[A-Za-z]:[\\/]|/)[^\s"')]+)"#).expect("path regex is valid")
    })
}

/// Replace absolute filesystem paths with `<path>` and bound the length.
pub fn sanitize_diagnostic(line: &str) -> String {
    let replaced = path_pattern().replace_all(line.trim(), "$1<path>");
    let mut out: String = replaced.chars().take(MAX_DIAGNOSTIC_CHARS).collect();
    if replaced.chars().count() > MAX_DIAGNOSTIC_CHARS {
        out.push('…');
    }
    out
}

/// Ring buffer of recent output lines.
#[derive(Debug, Clone)]
pub struct DiagnosticTail {
    lines: VecDeque<String>,
    capacity: usize,
}

impl DiagnosticTail {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, line: &str) {
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line.to_string());
    }

    /// Last line that is not a prompt or progress update, sanitized.
    pub fn last_meaningful(&self) -> Option<String> {
        self.lines
            .iter()
            .rev()
            .map(|l| l.trim())
            .find(|l| {
                !l.is_empty()
                    && !l.starts_with("Steam>")
                    && !l.to_ascii_lowercase().starts_with("progress:")
            })
            .map(sanitize_diagnostic)
    }
}
