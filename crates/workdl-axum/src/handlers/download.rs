//! Download handlers - single item start, stop and status.

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use workdl_core::DownloadSessionView;
use workdl_download::StartAck;

use crate::error::HttpError;
use crate::state::AppState;

/// Request to start a download. Accepts an id or a workshop link.
#[derive(Debug, Deserialize)]
pub struct StartDownloadRequest {
    #[serde(alias = "workshop_id")]
    pub item_id: String,
}

#[derive(Debug, Serialize)]
pub struct StopResponse {
    /// Whether a fetch or queue run was running.
    pub stopped: bool,
}

/// Start fetching one item.
pub async fn start(
    State(state): State<AppState>,
    Json(req): Json<StartDownloadRequest>,
) -> Result<Json<StartAck>, HttpError> {
    Ok(Json(state.engine.start_download(&req.item_id).await?))
}

/// Stop the running fetch. Idempotent.
pub async fn stop(State(state): State<AppState>) -> Json<StopResponse> {
    Json(StopResponse {
        stopped: state.engine.stop(),
    })
}

/// Current session snapshot.
pub async fn status(State(state): State<AppState>) -> Json<DownloadSessionView> {
    Json(state.engine.status())
}
