use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use super::directory::{fleet_devices, liveness_map, FleetFilter};
use super::ServiceError;
use crate::database::models::{DeviceRecord, TelemetrySnapshot, UnassignedDevice};
use crate::database::TelemetryStore;
use crate::provider::{DeviceInfo, TelemetryProvider};
use crate::telemetry::{DeviceMetadata, SignalRecord, SnapshotValues};

/// Outcome of a directory sync
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub success: bool,
    pub count: usize,
    pub devices: Vec<DeviceRecord>,
}

/// Snapshot returned by a live single-device sync
#[derive(Debug, Clone, Serialize)]
pub struct LiveTelemetry {
    #[serde(flatten)]
    pub snapshot: TelemetrySnapshot,
    pub device_name: String,
    pub address: String,
    pub log_time: Option<DateTime<Utc>>,
    pub active: bool,
}

/// A user's cached snapshot plus the current liveness flag
#[derive(Debug, Clone, Serialize)]
pub struct DeviceDetails {
    #[serde(flatten)]
    pub snapshot: TelemetrySnapshot,
    pub active: bool,
}

/// Pulls device metadata and snapshots from the provider into the cache
pub struct FleetSyncService {
    provider: Arc<dyn TelemetryProvider>,
    store: Arc<dyn TelemetryStore>,
    filter: FleetFilter,
    concurrency: usize,
}

impl FleetSyncService {
    pub fn new(
        provider: Arc<dyn TelemetryProvider>,
        store: Arc<dyn TelemetryStore>,
        filter: FleetFilter,
        concurrency: usize,
    ) -> Self {
        Self {
            provider,
            store,
            filter,
            concurrency: concurrency.max(1),
        }
    }

    /// Refresh the `devices` row of every fleet device.
    ///
    /// Directory failures abort the sync. Per-device problems only drop that
    /// device: a metadata fetch failure refreshes the name and keeps the cached
    /// metadata, a write failure leaves the device out of the report.
    pub async fn sync_directory(&self) -> Result<SyncReport, ServiceError> {
        let fleet = fleet_devices(self.provider.as_ref(), &self.filter).await?;
        info!("Syncing {} fleet devices from provider", fleet.len());

        let mut devices: Vec<DeviceRecord> = stream::iter(fleet)
            .map(|device| self.sync_device_row(device))
            .buffer_unordered(self.concurrency)
            .filter_map(|synced| async move { synced })
            .collect()
            .await;
        devices.sort_by(|a, b| a.tb_device_id.cmp(&b.tb_device_id));

        info!("Directory sync stored {} devices", devices.len());
        Ok(SyncReport {
            success: true,
            count: devices.len(),
            devices,
        })
    }

    async fn sync_device_row(&self, device: DeviceInfo) -> Option<DeviceRecord> {
        let metadata = match self
            .provider
            .fetch_timeseries(&device.tb_device_id, DeviceMetadata::KEYS)
            .await
        {
            Ok(series) => DeviceMetadata::from_timeseries(&device.tb_device_id, &series),
            Err(e) => {
                warn!(device = %device.tb_device_id, error = %e, "Metadata fetch failed, keeping cached fields");
                return self.refresh_device_name(device).await;
            }
        };

        let record = DeviceRecord::new(device.tb_device_id, Some(device.device_name), metadata);
        match self.store.upsert_device(&record).await {
            Ok(()) => Some(record),
            Err(e) => {
                warn!(device = %record.tb_device_id, error = %e, "Device upsert failed");
                None
            }
        }
    }

    /// Name-only write for when metadata could not be fetched
    async fn refresh_device_name(&self, device: DeviceInfo) -> Option<DeviceRecord> {
        if let Err(e) = self
            .store
            .upsert_device_name(&device.tb_device_id, &device.device_name)
            .await
        {
            warn!(device = %device.tb_device_id, error = %e, "Device upsert failed");
            return None;
        }

        match self.store.get_device(&device.tb_device_id).await {
            Ok(Some(cached)) => Some(cached),
            Ok(None) => Some(DeviceRecord::new(
                device.tb_device_id,
                Some(device.device_name),
                DeviceMetadata::default(),
            )),
            Err(e) => {
                warn!(device = %device.tb_device_id, error = %e, "Cached device read failed");
                None
            }
        }
    }

    /// Fetch the full snapshot of one fleet device and cache it, device row first
    pub async fn sync_device_telemetry(&self, tb_device_id: &str) -> Result<LiveTelemetry, ServiceError> {
        let directory = self.provider.device_directory().await?;
        let device = directory
            .into_iter()
            .find(|device| device.tb_device_id == tb_device_id)
            .filter(|device| self.filter.matches(&device.device_name))
            .ok_or_else(|| ServiceError::NotInFleet(tb_device_id.to_string()))?;

        let snapshot = self.fetch_snapshot(tb_device_id).await?;
        self.store
            .upsert_device(&DeviceRecord::new(
                tb_device_id,
                Some(device.device_name.clone()),
                snapshot.values.metadata(),
            ))
            .await?;
        self.store.upsert_snapshot(&snapshot).await?;

        let address = self
            .store
            .owner_address(tb_device_id)
            .await?
            .unwrap_or_else(|| "NA".to_string());
        let log_time = self.store.last_log_time(tb_device_id).await?;

        Ok(LiveTelemetry {
            snapshot,
            device_name: device.device_name,
            address,
            log_time,
            active: device.active,
        })
    }

    /// Give a device to the user at `address`, caching its snapshot on the way
    pub async fn assign_device(&self, address: &str, tb_device_id: &str) -> Result<TelemetrySnapshot, ServiceError> {
        let user_id = self
            .store
            .find_user_id(address)
            .await?
            .ok_or_else(|| ServiceError::UnknownUser(address.to_string()))?;

        let snapshot = self.fetch_snapshot(tb_device_id).await?;
        let device_name = self
            .store
            .get_device(tb_device_id)
            .await?
            .and_then(|device| device.device_name);
        self.store
            .upsert_device(&DeviceRecord::new(tb_device_id, device_name, snapshot.values.metadata()))
            .await?;
        self.store.upsert_snapshot(&snapshot).await?;
        self.store.assign_device(user_id, tb_device_id).await?;

        info!(device = tb_device_id, user = user_id, "Device assigned");
        Ok(snapshot)
    }

    /// Directory entries nobody owns yet. The directory is not name-filtered here.
    pub async fn unassigned_devices(&self) -> Result<Vec<UnassignedDevice>, ServiceError> {
        let directory = self.provider.device_directory().await?;
        let assigned = self.store.assigned_device_ids().await?;

        Ok(directory
            .into_iter()
            .filter(|device| !assigned.contains(&device.tb_device_id))
            .map(|device| UnassignedDevice {
                tb_device_id: device.tb_device_id,
                device_name: device.device_name,
                active: device.active,
            })
            .collect())
    }

    /// Cached snapshots of a user's devices. Liveness defaults to `false` when the
    /// directory cannot be read.
    pub async fn owner_device_details(&self, address: &str) -> Result<Vec<DeviceDetails>, ServiceError> {
        let snapshots = self.store.snapshots_for_owner(address).await?;
        if snapshots.is_empty() {
            return Ok(Vec::new());
        }

        let live = match self.provider.device_directory().await {
            Ok(directory) => liveness_map(&directory),
            Err(e) => {
                warn!(error = %e, "Could not read device liveness, reporting all inactive");
                Default::default()
            }
        };

        Ok(snapshots
            .into_iter()
            .map(|snapshot| {
                let active = live.get(&snapshot.tb_device_id).copied().unwrap_or(false);
                DeviceDetails { snapshot, active }
            })
            .collect())
    }

    async fn fetch_snapshot(&self, tb_device_id: &str) -> Result<TelemetrySnapshot, ServiceError> {
        let series = self
            .provider
            .fetch_timeseries(tb_device_id, SnapshotValues::KEYS)
            .await?;
        Ok(TelemetrySnapshot {
            tb_device_id: tb_device_id.to_string(),
            values: SnapshotValues::from_timeseries(tb_device_id, &series),
        })
    }
}
