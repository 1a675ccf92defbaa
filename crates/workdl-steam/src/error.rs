//! Error types for Steam Web API operations.
//!
//! Mapped to [`workdl_core::DetailsError`] at the port boundary.

use thiserror::Error;

/// Result type alias for Steam operations.
pub type SteamResult<T> = Result<T, SteamError>;

/// Errors related to Steam Web API calls.
#[derive(Debug, Error)]
pub enum SteamError {
    /// The API answered with an HTTP error status.
    #[error("Steam API request failed with status {status}")]
    ApiRequestFailed { status: u16 },

    /// The API answered with an unexpected document.
    #[error("Invalid response from Steam API: {message}")]
    InvalidResponse { message: String },

    /// Network or HTTP client error.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl From<SteamError> for workdl_core::DetailsError {
    fn from(err: SteamError) -> Self {
        Self(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_maps_to_details_error() {
        let err: workdl_core::DetailsError = SteamError::ApiRequestFailed { status: 503 }.into();
        assert!(err.to_string().contains("503"));
    }
}
