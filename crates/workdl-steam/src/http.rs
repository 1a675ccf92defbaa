//! HTTP backend abstraction for the Steam Web API.
//!
//! The production backend uses reqwest with retry for transient failures;
//! tests inject a fake that returns canned documents.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::config::SteamClientConfig;
use crate::error::{SteamError, SteamResult};

// ============================================================================
// HTTP Backend Trait
// ============================================================================

/// Backend able to POST a form and return the JSON answer.
#[async_trait]
pub trait FormBackend: Send + Sync {
    async fn post_form(
        &self,
        url: &str,
        form: &[(String, String)],
    ) -> SteamResult<serde_json::Value>;
}

// ============================================================================
// Reqwest Backend
// ============================================================================

/// Production backend using reqwest with exponential backoff on 5xx and
/// network errors.
pub struct ReqwestBackend {
    client: reqwest::Client,
    max_retries: u8,
    retry_base_delay: Duration,
}

impl ReqwestBackend {
    pub fn new(config: &SteamClientConfig) -> SteamResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            max_retries: config.max_retries,
            retry_base_delay: config.retry_base_delay,
        })
    }

    async fn send_with_retry(
        &self,
        url: &str,
        form: &[(String, String)],
    ) -> SteamResult<reqwest::Response> {
        let mut last_error: Option<SteamError> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.retry_base_delay * 2u32.pow(u32::from(attempt) - 1);
                debug!(target: "workdl.steam", attempt, ?delay, "Retrying details request");
                tokio::time::sleep(delay).await;
            }

            match self.client.post(url).form(form).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }
                    // 5xx errors are retryable (server-side issues)
                    if status.is_server_error() && attempt < self.max_retries {
                        last_error = Some(SteamError::ApiRequestFailed {
                            status: status.as_u16(),
                        });
                        continue;
                    }
                    return Err(SteamError::ApiRequestFailed {
                        status: status.as_u16(),
                    });
                }
                Err(e) => {
                    if attempt < self.max_retries {
                        last_error = Some(e.into());
                        continue;
                    }
                    return Err(e.into());
                }
            }
        }

        Err(last_error.unwrap_or_else(|| SteamError::InvalidResponse {
            message: "Unknown error during request".to_string(),
        }))
    }
}

#[async_trait]
impl FormBackend for ReqwestBackend {
    async fn post_form(
        &self,
        url: &str,
        form: &[(String, String)],
    ) -> SteamResult<serde_json::Value> {
        let response = self.send_with_retry(url, form).await?;
        Ok(response.json().await?)
    }
}

// ============================================================================
// Fake Backend for Testing
// ============================================================================

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Backend returning one canned document and recording submitted forms.
    pub struct FakeBackend {
        pub response: SteamResult<serde_json::Value>,
        pub requests: Arc<Mutex<Vec<(String, Vec<(String, String)>)>>>,
    }

    impl FakeBackend {
        pub fn ok(json: serde_json::Value) -> Self {
            Self {
                response: Ok(json),
                requests: Arc::default(),
            }
        }

        pub fn failing(status: u16) -> Self {
            Self {
                response: Err(SteamError::ApiRequestFailed { status }),
                requests: Arc::default(),
            }
        }
    }

    #[async_trait]
    impl FormBackend for FakeBackend {
        async fn post_form(
            &self,
            url: &str,
            form: &[(String, String)],
        ) -> SteamResult<serde_json::Value> {
            self.requests
                .lock()
                .unwrap()
                .push((url.to_string(), form.to_vec()));
            match &self.response {
                Ok(json) => Ok(json.clone()),
                Err(SteamError::ApiRequestFailed { status }) => {
                    Err(SteamError::ApiRequestFailed { status: *status })
                }
                Err(other) => Err(SteamError::InvalidResponse {
                    message: other.to_string(),
                }),
            }
        }
    }
}
