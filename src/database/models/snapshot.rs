use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::telemetry::SnapshotValues;

/// Latest-value cache row of the `telemetry_device` table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, FromRow)]
pub struct TelemetrySnapshot {
    pub tb_device_id: String,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub values: SnapshotValues,
}
