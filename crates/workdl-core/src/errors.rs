//! Engine error taxonomy.
//!
//! Every failure crossing the engine boundary is an [`EngineError`]. Adapters
//! (HTTP, CLI) only need [`EngineError::kind`] to render distinct feedback for
//! validation, conflict, not-found and internal failures.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::settings::SettingsError;

/// Result alias used across the engine crates.
pub type EngineResult<T> = Result<T, EngineError>;

/// Stable error category exposed to callers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad or missing input, rejected before any state mutation.
    Validation,
    /// A download is already active.
    Conflict,
    /// The referenced item does not exist.
    NotFound,
    /// Spawn, subprocess, filesystem or other internal failure.
    Internal,
}

/// Error type for engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Empty or malformed identifier, batch text or request.
    #[error("Invalid input: {0}")]
    Validation(String),

    /// A fetch is already running for another item.
    #[error("A download is already in progress for item {active}")]
    AlreadyRunning {
        /// The item currently being fetched.
        active: String,
    },

    /// The fetch tool could not be launched.
    #[error("Failed to launch fetch tool: {0}")]
    SpawnFailure(String),

    /// The fetch tool exited abnormally.
    #[error("Fetch tool failed: {0}")]
    Subprocess(String),

    /// Remove/fix/launch on something that is not there.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Filesystem failure.
    #[error("I/O error: {context}: {source}")]
    Io {
        /// What the engine was doing.
        context: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Settings failed validation or could not be persisted.
    #[error(transparent)]
    Settings(#[from] SettingsError),

    /// Anything else.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Wrap an I/O error with a short description of the failed operation.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Category used by adapters to pick a status code or exit code.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Settings(SettingsError::Invalid(_)) => ErrorKind::Validation,
            Self::AlreadyRunning { .. } => ErrorKind::Conflict,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::SpawnFailure(_)
            | Self::Subprocess(_)
            | Self::Io { .. }
            | Self::Settings(_)
            | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Message suitable for showing to an end user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(msg) | Self::NotFound(msg) => msg.clone(),
            Self::AlreadyRunning { .. } => "A download is already in progress".to_string(),
            Self::SpawnFailure(msg) => format!("Could not start the fetch tool: {msg}"),
            Self::Subprocess(msg) => format!("Download failed: {msg}"),
            Self::Io { context, source } => format!("{context}: {source}"),
            Self::Settings(err) => err.to_string(),
            Self::Internal(msg) => format!("Internal error: {msg}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(EngineError::validation("x").kind(), ErrorKind::Validation);
        assert_eq!(
            EngineError::AlreadyRunning {
                active: "1".into()
            }
            .kind(),
            ErrorKind::Conflict
        );
        assert_eq!(EngineError::NotFound("x".into()).kind(), ErrorKind::NotFound);
        assert_eq!(
            EngineError::SpawnFailure("missing".into()).kind(),
            ErrorKind::Internal
        );
        assert_eq!(
            EngineError::io("rename", std::io::Error::other("boom")).kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn test_invalid_settings_are_validation_errors() {
        let err = EngineError::from(SettingsError::Invalid("bad".into()));
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = EngineError::from(SettingsError::Storage("disk".into()));
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_error_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::NotFound).unwrap();
        assert_eq!(json, "\"not_found\"");
    }
}
