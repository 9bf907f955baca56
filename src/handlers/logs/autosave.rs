use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct AutosaveStatus {
    pub enabled: bool,
}

/// GET /api/logs/autosave
pub async fn get(State(state): State<AppState>) -> ApiResult<AutosaveStatus> {
    Ok(ApiResponse::success(AutosaveStatus {
        enabled: state.scheduler.autosave_enabled(),
    }))
}

/// PUT /api/logs/autosave - Pause or resume periodic sampling
pub async fn put(State(state): State<AppState>, Json(body): Json<AutosaveStatus>) -> ApiResult<AutosaveStatus> {
    state.scheduler.set_autosave(body.enabled);
    Ok(ApiResponse::success(AutosaveStatus {
        enabled: state.scheduler.autosave_enabled(),
    }))
}
