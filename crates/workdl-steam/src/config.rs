//! Public configuration for the Steam client.

use std::time::Duration;

/// Default endpoint for published file details.
pub const DEFAULT_DETAILS_URL: &str =
    "https://api.steampowered.com/ISteamRemoteStorage/GetPublishedFileDetails/v1/";

/// Configuration for the Steam client.
///
/// # Example
///
/// ```
/// use workdl_steam::SteamClientConfig;
/// use std::time::Duration;
///
/// let config = SteamClientConfig::new()
///     .with_timeout(Duration::from_secs(5))
///     .with_user_agent("my-app/1.0");
/// ```
#[derive(Debug, Clone)]
pub struct SteamClientConfig {
    pub(crate) details_url: String,
    pub(crate) user_agent: String,
    pub(crate) timeout: Duration,
    /// Maximum number of retry attempts for transient errors
    pub(crate) max_retries: u8,
    /// Base delay for exponential backoff
    pub(crate) retry_base_delay: Duration,
}

impl Default for SteamClientConfig {
    fn default() -> Self {
        Self {
            details_url: DEFAULT_DETAILS_URL.to_string(),
            user_agent: concat!("workdl-steam/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout: Duration::from_secs(10),
            max_retries: 2,
            retry_base_delay: Duration::from_millis(500),
        }
    }
}

impl SteamClientConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the details endpoint (useful against a local stub).
    #[must_use]
    pub fn with_details_url(mut self, url: impl Into<String>) -> Self {
        self.details_url = url.into();
        self
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Request timeout. Defaults to 10 seconds.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_max_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries;
        self
    }

    #[must_use]
    pub const fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }
}
