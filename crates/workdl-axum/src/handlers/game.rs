//! Game launch.

use axum::Json;
use axum::extract::State;
use workdl_download::LaunchAck;

use crate::error::HttpError;
use crate::state::AppState;

pub async fn launch(State(state): State<AppState>) -> Result<Json<LaunchAck>, HttpError> {
    Ok(Json(state.engine.launch_game().await?))
}
