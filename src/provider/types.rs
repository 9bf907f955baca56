use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::warn;

use crate::telemetry::SignalValue;

/// One entry of the provider's device directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub tb_device_id: String,
    pub device_name: String,
    pub active: bool,
}

impl DeviceInfo {
    /// Lift a raw directory record. Records without an id are rejected.
    pub(crate) fn from_raw(raw: &Value) -> Option<Self> {
        let tb_device_id = raw
            .get("id")
            .and_then(|id| id.get("id"))
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())?
            .to_string();

        let device_name = raw
            .get("name")
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
            .unwrap_or("Unnamed Device")
            .to_string();

        let active = raw.get("active").and_then(Value::as_bool).unwrap_or(false);

        Some(Self {
            tb_device_id,
            device_name,
            active,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct DirectoryPage {
    #[serde(default)]
    pub data: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeseriesPoint {
    #[serde(default)]
    pub ts: i64,
    #[serde(default)]
    pub value: Value,
}

/// Provider time-series response: key -> samples, newest first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timeseries(HashMap<String, Vec<TimeseriesPoint>>);

impl Timeseries {
    pub fn insert(&mut self, key: impl Into<String>, points: Vec<TimeseriesPoint>) {
        self.0.insert(key.into(), points);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Most recent value of `key`. A missing or empty series is logged and yields `None`.
    pub fn latest<T: SignalValue>(&self, tb_device_id: &str, key: &str) -> Option<T> {
        let Some(point) = self.0.get(key).and_then(|points| points.first()) else {
            warn!(device = tb_device_id, key, "No data for telemetry key");
            return None;
        };
        T::from_json(&point.value)
    }
}
