use axum::{extract::State, Json};

use crate::error::ApiError;
use crate::services::SyncReport;
use crate::state::AppState;

/// POST /api/sync-now - Refresh every fleet device's row from the provider
pub async fn post(State(state): State<AppState>) -> Result<Json<SyncReport>, ApiError> {
    let report = state.sync.sync_directory().await.map_err(|e| {
        tracing::error!("Sync error: {}", e);
        ApiError::from(e)
    })?;
    Ok(Json(report))
}
