use axum::{extract::State, Json};
use serde::Deserialize;

use crate::database::models::TelemetrySnapshot;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    pub address: String,
    pub tb_device_id: String,
}

/// POST /api/assign-device - Map a device to the user with this address
pub async fn post(State(state): State<AppState>, Json(body): Json<AssignRequest>) -> ApiResult<TelemetrySnapshot> {
    if body.address.trim().is_empty() || body.tb_device_id.trim().is_empty() {
        return Err(ApiError::bad_request("address and tb_device_id are required"));
    }
    let snapshot = state
        .sync
        .assign_device(body.address.trim(), body.tb_device_id.trim())
        .await?;
    Ok(ApiResponse::success(snapshot))
}
