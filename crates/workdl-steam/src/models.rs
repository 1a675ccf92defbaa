//! Wire types for `GetPublishedFileDetails` and their conversion to domain details.

use serde::{Deserialize, Deserializer};

use workdl_core::{WorkshopDetails, WorkshopItemId};

use crate::error::{SteamError, SteamResult};

/// Steam's per-item success marker.
const RESULT_OK: i64 = 1;

#[derive(Debug, Deserialize)]
pub(crate) struct DetailsEnvelope {
    pub response: DetailsResponse,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DetailsResponse {
    #[serde(default)]
    pub publishedfiledetails: Vec<PublishedFile>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PublishedFile {
    #[serde(default)]
    pub result: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub preview_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Steam encodes 64-bit sizes as strings; accept both forms.
fn lenient_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_u64(),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Convert a raw details document into domain details.
///
/// `Ok(None)` when Steam does not know the item.
pub(crate) fn parse_details(
    id: &WorkshopItemId,
    raw: serde_json::Value,
) -> SteamResult<Option<WorkshopDetails>> {
    let envelope: DetailsEnvelope = serde_json::from_value(raw)?;
    let Some(file) = envelope.response.publishedfiledetails.into_iter().next() else {
        return Err(SteamError::InvalidResponse {
            message: "publishedfiledetails is empty".to_string(),
        });
    };

    if file.result != RESULT_OK {
        return Ok(None);
    }

    let title = file
        .title
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| id.to_string());

    Ok(Some(WorkshopDetails {
        id: id.clone(),
        title,
        file_size: file.file_size,
        preview_url: file.preview_url.filter(|u| !u.is_empty()),
        description: file.description.filter(|d| !d.is_empty()),
    }))
}
