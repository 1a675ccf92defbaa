//! CLI-specific error types and exit codes.

use thiserror::Error;
use workdl_core::{EngineError, ErrorKind};

/// CLI-specific error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Bad arguments or input.
    #[error("{0}")]
    Validation(String),

    /// A download is already running.
    #[error("{0}")]
    Conflict(String),

    /// The referenced item does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Anything else.
    #[error("{0}")]
    Failed(String),
}

impl CliError {
    /// Exit code for this error.
    ///
    /// - 1: general failure
    /// - 2: invalid input
    /// - 3: a download is already running
    /// - 4: not found
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Failed(_) => 1,
            Self::Validation(_) => 2,
            Self::Conflict(_) => 3,
            Self::NotFound(_) => 4,
        }
    }

    /// Map an HTTP error status from the server.
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            400 | 422 => Self::Validation(message),
            409 => Self::Conflict(message),
            404 => Self::NotFound(message),
            _ => Self::Failed(message),
        }
    }
}

impl From<EngineError> for CliError {
    fn from(err: EngineError) -> Self {
        let message = err.user_message();
        match err.kind() {
            ErrorKind::Validation => Self::Validation(message),
            ErrorKind::Conflict => Self::Conflict(message),
            ErrorKind::NotFound => Self::NotFound(message),
            ErrorKind::Internal => Self::Failed(message),
        }
    }
}

/// Exit code for an error bubbled up to `main`.
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    if let Some(cli) = err.downcast_ref::<CliError>() {
        return cli.exit_code();
    }
    if let Some(engine) = err.downcast_ref::<EngineError>() {
        return match engine.kind() {
            ErrorKind::Validation => 2,
            ErrorKind::Conflict => 3,
            ErrorKind::NotFound => 4,
            ErrorKind::Internal => 1,
        };
    }
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::Validation(String::new()).exit_code(), 2);
        assert_eq!(CliError::Conflict(String::new()).exit_code(), 3);
        assert_eq!(CliError::NotFound(String::new()).exit_code(), 4);
        assert_eq!(CliError::Failed(String::new()).exit_code(), 1);
    }

    #[test]
    fn test_engine_errors_through_anyhow() {
        let err = anyhow::Error::from(EngineError::AlreadyRunning {
            active: "1".to_string(),
        });
        assert_eq!(exit_code_for(&err), 3);

        let err = anyhow::Error::from(EngineError::NotFound("x".to_string()));
        assert_eq!(exit_code_for(&err), 4);

        let err = anyhow::anyhow!("boom");
        assert_eq!(exit_code_for(&err), 1);
    }

    #[test]
    fn test_http_status_mapping() {
        assert!(matches!(
            CliError::from_status(409, "busy".into()),
            CliError::Conflict(_)
        ));
        assert!(matches!(
            CliError::from_status(500, "x".into()),
            CliError::Failed(_)
        ));
    }
}
