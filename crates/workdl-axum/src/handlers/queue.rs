//! Queue handlers - batch enqueue, listing and processing.

use axum::Json;
use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};
use workdl_core::WorkshopItemId;
use workdl_download::{ProcessAck, QueueSnapshot};

use super::ItemsInput;
use crate::error::HttpError;
use crate::state::AppState;

/// Batch input: free-form text or a list of ids/links.
#[derive(Debug, Deserialize)]
pub struct EnqueueRequest {
    #[serde(alias = "items")]
    pub text: ItemsInput,
}

#[derive(Debug, Serialize)]
pub struct QueueResponse {
    #[serde(flatten)]
    pub snapshot: QueueSnapshot,
    pub count: usize,
}

impl From<QueueSnapshot> for QueueResponse {
    fn from(snapshot: QueueSnapshot) -> Self {
        Self {
            count: snapshot.items.len(),
            snapshot,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EnqueueResponse {
    pub added: Vec<WorkshopItemId>,
    pub duplicates: Vec<WorkshopItemId>,
    pub queue: QueueResponse,
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub cleared: usize,
}

#[derive(Debug, Serialize)]
pub struct RemoveResponse {
    /// False when the id was not queued.
    pub removed: bool,
    pub queue: QueueResponse,
}

/// List the queue.
pub async fn list(State(state): State<AppState>) -> Json<QueueResponse> {
    Json(state.engine.queue_snapshot().into())
}

/// Enqueue ids parsed from the request text.
pub async fn add(
    State(state): State<AppState>,
    Json(req): Json<EnqueueRequest>,
) -> Result<Json<EnqueueResponse>, HttpError> {
    let result = state.engine.enqueue_text(&req.text.into_vec().join("\n"))?;
    Ok(Json(EnqueueResponse {
        added: result.added,
        duplicates: result.duplicates,
        queue: state.engine.queue_snapshot().into(),
    }))
}

/// Drop every pending entry.
pub async fn clear(State(state): State<AppState>) -> Json<ClearResponse> {
    Json(ClearResponse {
        cleared: state.engine.clear_queue(),
    })
}

/// Start the background queue run.
pub async fn process(State(state): State<AppState>) -> Result<Json<ProcessAck>, HttpError> {
    Ok(Json(state.engine.process_queue().await?))
}

/// Remove one pending entry. Removing an absent id is a no-op.
pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RemoveResponse>, HttpError> {
    let removed = state.engine.remove_from_queue(&id)?;
    Ok(Json(RemoveResponse {
        removed,
        queue: state.engine.queue_snapshot().into(),
    }))
}
