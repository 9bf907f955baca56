use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::telemetry::DeviceMetadata;

/// Cached row of the `devices` table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, FromRow)]
pub struct DeviceRecord {
    pub tb_device_id: String,
    pub device_name: Option<String>,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub metadata: DeviceMetadata,
}

impl DeviceRecord {
    pub fn new(tb_device_id: impl Into<String>, device_name: Option<String>, metadata: DeviceMetadata) -> Self {
        Self {
            tb_device_id: tb_device_id.into(),
            device_name,
            metadata,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct DeviceWithOwner {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub device: DeviceRecord,
    pub address: Option<String>,
}

/// Directory entry that no user has claimed yet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnassignedDevice {
    pub tb_device_id: String,
    pub device_name: String,
    pub active: bool,
}
