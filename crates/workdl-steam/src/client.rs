//! Workshop details client.

use async_trait::async_trait;
use tracing::debug;

use workdl_core::{DetailsError, WorkshopDetails, WorkshopDetailsPort, WorkshopItemId};

use crate::config::SteamClientConfig;
use crate::error::SteamResult;
use crate::http::{FormBackend, ReqwestBackend};
use crate::models::parse_details;

/// Client for `GetPublishedFileDetails`, generic over the HTTP backend.
pub struct SteamWorkshopClient<B: FormBackend> {
    backend: B,
    details_url: String,
}

/// The client used in production.
pub type DefaultSteamClient = SteamWorkshopClient<ReqwestBackend>;

impl DefaultSteamClient {
    /// Build a reqwest-backed client.
    pub fn new(config: &SteamClientConfig) -> SteamResult<Self> {
        Ok(Self {
            backend: ReqwestBackend::new(config)?,
            details_url: config.details_url.clone(),
        })
    }
}

impl<B: FormBackend> SteamWorkshopClient<B> {
    #[cfg(test)]
    pub(crate) fn with_backend(backend: B, details_url: impl Into<String>) -> Self {
        Self {
            backend,
            details_url: details_url.into(),
        }
    }

    /// Fetch details for one item.
    pub async fn details(&self, id: &WorkshopItemId) -> SteamResult<Option<WorkshopDetails>> {
        let form = vec![
            ("itemcount".to_string(), "1".to_string()),
            ("publishedfileids[0]".to_string(), id.to_string()),
        ];
        let raw = self.backend.post_form(&self.details_url, &form).await?;
        let details = parse_details(id, raw)?;
        debug!(target: "workdl.steam", item_id = %id, found = details.is_some(), "Fetched workshop details");
        Ok(details)
    }
}

#[async_trait]
impl<B: FormBackend> WorkshopDetailsPort for SteamWorkshopClient<B> {
    async fn fetch_details(
        &self,
        id: &WorkshopItemId,
    ) -> Result<Option<WorkshopDetails>, DetailsError> {
        Ok(self.details(id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::testing::FakeBackend;
    use serde_json::json;

    #[tokio::test]
    async fn test_posts_expected_form() {
        let backend = FakeBackend::ok(json!({
            "response": { "publishedfiledetails": [{ "result": 1, "title": "Der Riese", "file_size": "10" }] }
        }));
        let requests = std::sync::Arc::clone(&backend.requests);
        let client = SteamWorkshopClient::with_backend(backend, "http://stub/details");

        let id = WorkshopItemId::parse("123").unwrap();
        let details = client.details(&id).await.unwrap().unwrap();
        assert_eq!(details.title, "Der Riese");

        let recorded = requests.lock().unwrap();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].0, "http://stub/details");
        assert!(recorded[0].1.contains(&("itemcount".to_string(), "1".to_string())));
        assert!(
            recorded[0]
                .1
                .contains(&("publishedfileids[0]".to_string(), "123".to_string()))
        );
    }

    #[tokio::test]
    async fn test_port_maps_errors() {
        let client = SteamWorkshopClient::with_backend(FakeBackend::failing(502), "http://stub");
        let id = WorkshopItemId::parse("5").unwrap();
        let err = client.fetch_details(&id).await.unwrap_err();
        assert!(err.to_string().contains("502"));
    }
}
