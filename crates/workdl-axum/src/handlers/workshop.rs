//! Workshop details lookup.

use axum::Json;
use axum::extract::{Path, State};
use workdl_download::WorkshopInfo;

use crate::error::HttpError;
use crate::state::AppState;

/// Remote details for an item plus its install state.
pub async fn info(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<WorkshopInfo>, HttpError> {
    Ok(Json(state.engine.workshop_info(&id).await?))
}
