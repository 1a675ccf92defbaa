//! Workshop item details lookup port.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::item::WorkshopItemId;

/// Failure talking to the content platform.
#[derive(Debug, Clone, thiserror::Error)]
#[error("workshop details lookup failed: {0}")]
pub struct DetailsError(pub String);

/// Remote details for one workshop item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkshopDetails {
    pub id: WorkshopItemId,
    pub title: String,
    /// Size in bytes as reported by the platform.
    pub file_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Lookup of item details from the content platform.
///
/// Returns `Ok(None)` when the platform does not know the item. Callers treat
/// errors as non-fatal: details only annotate a download.
#[async_trait]
pub trait WorkshopDetailsPort: Send + Sync {
    async fn fetch_details(
        &self,
        id: &WorkshopItemId,
    ) -> Result<Option<WorkshopDetails>, DetailsError>;
}

/// Details port that never knows anything. Used offline and in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopWorkshopDetails;

#[async_trait]
impl WorkshopDetailsPort for NoopWorkshopDetails {
    async fn fetch_details(
        &self,
        _id: &WorkshopItemId,
    ) -> Result<Option<WorkshopDetails>, DetailsError> {
        Ok(None)
    }
}
