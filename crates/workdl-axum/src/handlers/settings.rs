//! Settings handlers - application configuration.

use axum::Json;
use axum::extract::State;
use workdl_core::{Settings, SettingsUpdate};

use crate::error::HttpError;
use crate::state::AppState;

/// Get application settings.
pub async fn get(State(state): State<AppState>) -> Result<Json<Settings>, HttpError> {
    Ok(Json(state.engine.settings().await?))
}

/// Merge a partial update into the settings.
pub async fn update(
    State(state): State<AppState>,
    Json(req): Json<SettingsUpdate>,
) -> Result<Json<Settings>, HttpError> {
    Ok(Json(state.engine.update_settings(&req).await?))
}
