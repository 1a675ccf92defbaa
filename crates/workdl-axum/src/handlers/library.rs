//! Library handlers - installed items and compatibility fixes.

use axum::Json;
use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};
use workdl_core::{CompatibilityMismatch, FixReport, FixSelection, LibraryItem};

use super::ItemsInput;
use crate::error::HttpError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct LibraryResponse {
    pub items: Vec<LibraryItem>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct MismatchResponse {
    pub items: Vec<CompatibilityMismatch>,
    pub count: usize,
}

/// Fix request: `"all"`, or a list of ids (`"all"` anywhere selects everything).
#[derive(Debug, Deserialize)]
pub struct FixRequest {
    pub items: ItemsInput,
}

/// Rescan and list installed items.
pub async fn list(State(state): State<AppState>) -> Result<Json<LibraryResponse>, HttpError> {
    let items = state.engine.library_items().await?;
    Ok(Json(LibraryResponse {
        count: items.len(),
        items,
    }))
}

/// Delete one installed item by id or folder name.
pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<LibraryItem>, HttpError> {
    Ok(Json(state.engine.remove_library_item(&id).await?))
}

/// Items whose folder breaks the naming convention.
pub async fn mismatches(
    State(state): State<AppState>,
) -> Result<Json<MismatchResponse>, HttpError> {
    let items = state.engine.mismatches().await?;
    Ok(Json(MismatchResponse {
        count: items.len(),
        items,
    }))
}

/// Rename selected mismatched folders.
pub async fn fix(
    State(state): State<AppState>,
    Json(req): Json<FixRequest>,
) -> Result<Json<FixReport>, HttpError> {
    let selection = FixSelection::from_items(&req.items.into_vec())?;
    Ok(Json(state.engine.fix_compatibility(&selection).await?))
}
