use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::telemetry::LogSample;

/// A sample about to be appended to `device_logs`
#[derive(Debug, Clone, PartialEq)]
pub struct NewLogEntry {
    pub tb_device_id: String,
    pub device_code: Option<String>,
    pub sample: LogSample,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct DeviceLogEntry {
    pub id: i64,
    pub tb_device_id: String,
    pub device_code: Option<String>,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub sample: LogSample,
    pub log_time: DateTime<Utc>,
}

/// Latest log of one device joined with its name, location and owner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct LatestLogRow {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub entry: DeviceLogEntry,
    pub device_name: Option<String>,
    pub city: Option<String>,
    pub address: Option<String>,
}

/// Inclusive time window for log queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl TimeRange {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from <= at && at <= self.to
    }
}
