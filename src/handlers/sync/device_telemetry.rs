use axum::extract::{Path, State};

use crate::middleware::{ApiResponse, ApiResult};
use crate::services::sync_service::LiveTelemetry;
use crate::state::AppState;

/// POST /api/device/:tb_device_id/sync-telemetry - Fetch and cache one device's snapshot
pub async fn post(State(state): State<AppState>, Path(tb_device_id): Path<String>) -> ApiResult<LiveTelemetry> {
    let live = state.sync.sync_device_telemetry(&tb_device_id).await?;
    Ok(ApiResponse::success(live))
}
