use axum::extract::{Path, State};

use crate::database::models::{DeviceWithOwner, UnassignedDevice};
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::sync_service::DeviceDetails;
use crate::state::AppState;

/// GET /api/devices - Cached devices with their owner's address
pub async fn get(State(state): State<AppState>) -> ApiResult<Vec<DeviceWithOwner>> {
    Ok(ApiResponse::success(state.store.list_devices_with_owner().await?))
}

/// GET /api/unassigned-devices - Provider devices nobody owns yet
pub async fn unassigned(State(state): State<AppState>) -> ApiResult<Vec<UnassignedDevice>> {
    Ok(ApiResponse::success(state.sync.unassigned_devices().await?))
}

/// GET /api/user-devices-details/:address - A user's snapshots with live status
pub async fn owner_details(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> ApiResult<Vec<DeviceDetails>> {
    Ok(ApiResponse::success(state.sync.owner_device_details(&address).await?))
}
