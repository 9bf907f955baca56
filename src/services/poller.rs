use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::directory::liveness_map;
use super::ServiceError;
use crate::config::SchedulerConfig;
use crate::database::models::{DeviceRecord, NewLogEntry};
use crate::database::TelemetryStore;
use crate::provider::TelemetryProvider;
use crate::telemetry::{LogSample, SignalRecord};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TickReport {
    pub written: usize,
    pub inactive: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TickOutcome {
    Completed(TickReport),
    /// Auto-save is switched off
    Paused,
    /// Another tick was still running
    Skipped,
}

/// Releases the busy flag when the tick ends, however it ends
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Periodically appends one log sample for every live cached device
pub struct PollingScheduler {
    provider: Arc<dyn TelemetryProvider>,
    store: Arc<dyn TelemetryStore>,
    interval: Duration,
    device_timeout: Duration,
    autosave: AtomicBool,
    busy: AtomicBool,
}

impl PollingScheduler {
    pub fn new(
        provider: Arc<dyn TelemetryProvider>,
        store: Arc<dyn TelemetryStore>,
        config: &SchedulerConfig,
    ) -> Self {
        Self {
            provider,
            store,
            interval: config.interval(),
            device_timeout: config.device_timeout(),
            autosave: AtomicBool::new(config.autosave_enabled),
            busy: AtomicBool::new(false),
        }
    }

    pub fn autosave_enabled(&self) -> bool {
        self.autosave.load(Ordering::Relaxed)
    }

    pub fn set_autosave(&self, enabled: bool) {
        self.autosave.store(enabled, Ordering::Relaxed);
        info!("Auto-save {}", if enabled { "resumed" } else { "paused" });
    }

    /// Spawn the timer loop. Each tick runs on its own task so a slow tick never
    /// delays the timer; overlapping ticks are turned away by the busy flag.
    pub fn start(self: Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // first tick fires immediately; the first sample is due one period after start
            ticker.tick().await;
            info!("Polling scheduler started, every {}s", self.interval.as_secs());

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                let scheduler = self.clone();
                tokio::spawn(async move {
                    if let Err(e) = scheduler.run_tick().await {
                        error!(error = %e, "Polling tick aborted");
                    }
                });
            }
            info!("Polling scheduler stopped");
        })
    }

    /// One polling pass.
    ///
    /// The directory is read once and its liveness flags apply to every device of
    /// this pass. A directory failure aborts the pass; a device failure or timeout
    /// only costs that device its sample.
    pub async fn run_tick(&self) -> Result<TickOutcome, ServiceError> {
        if !self.autosave_enabled() {
            info!("Auto-saving paused");
            return Ok(TickOutcome::Paused);
        }
        let Some(_busy) = BusyGuard::acquire(&self.busy) else {
            warn!("Previous tick still running, skipping this one");
            return Ok(TickOutcome::Skipped);
        };

        let live = liveness_map(&self.provider.device_directory().await?);
        let devices = self.store.list_devices().await?;

        let mut report = TickReport::default();
        for device in &devices {
            if !live.get(&device.tb_device_id).copied().unwrap_or(false) {
                debug!(device = %device.tb_device_id, "Device inactive, not sampled");
                report.inactive += 1;
                continue;
            }

            match tokio::time::timeout(self.device_timeout, self.sample_device(device)).await {
                Ok(Ok(())) => report.written += 1,
                Ok(Err(e)) => {
                    warn!(device = %device.tb_device_id, error = %e, "Device sample failed");
                    report.failed += 1;
                }
                Err(_) => {
                    warn!(
                        device = %device.tb_device_id,
                        "Device sample timed out after {}s",
                        self.device_timeout.as_secs()
                    );
                    report.failed += 1;
                }
            }
        }

        info!(
            written = report.written,
            inactive = report.inactive,
            failed = report.failed,
            "Polling tick complete"
        );
        Ok(TickOutcome::Completed(report))
    }

    async fn sample_device(&self, device: &DeviceRecord) -> Result<(), ServiceError> {
        let series = self
            .provider
            .fetch_timeseries(&device.tb_device_id, LogSample::KEYS)
            .await?;
        let entry = NewLogEntry {
            tb_device_id: device.tb_device_id.clone(),
            device_code: device.metadata.device_code.clone(),
            sample: LogSample::from_timeseries(&device.tb_device_id, &series),
        };
        self.store.insert_log(&entry).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MockTelemetryStore;
    use crate::provider::{DeviceInfo, MockTelemetryProvider, ProviderError, Timeseries, TimeseriesPoint};
    use crate::telemetry::DeviceMetadata;
    use serde_json::json;

    fn config() -> SchedulerConfig {
        SchedulerConfig {
            interval_secs: 60,
            autosave_enabled: true,
            device_timeout_secs: 5,
            sync_on_startup: false,
            sync_concurrency: 1,
        }
    }

    fn info(id: &str, active: bool) -> DeviceInfo {
        DeviceInfo {
            tb_device_id: id.to_string(),
            device_name: format!("Lift {id}"),
            active,
        }
    }

    fn cached(id: &str) -> DeviceRecord {
        DeviceRecord::new(
            id,
            Some(format!("Lift {id}")),
            DeviceMetadata {
                device_code: Some(format!("code-{id}")),
                ..Default::default()
            },
        )
    }

    fn current(value: f64) -> Timeseries {
        let mut series = Timeseries::default();
        series.insert("CUR", vec![TimeseriesPoint { ts: 1, value: json!(value) }]);
        series
    }

    fn scheduler(provider: MockTelemetryProvider, store: MockTelemetryStore) -> PollingScheduler {
        PollingScheduler::new(Arc::new(provider), Arc::new(store), &config())
    }

    #[tokio::test]
    async fn inactive_devices_are_not_sampled() {
        let mut provider = MockTelemetryProvider::new();
        provider
            .expect_device_directory()
            .returning(|| Ok(vec![info("a", false)]));
        provider.expect_fetch_timeseries().never();

        let mut store = MockTelemetryStore::new();
        store
            .expect_list_devices()
            .returning(|| Ok(vec![cached("a"), cached("missing")]));
        store.expect_insert_log().times(0);

        let outcome = scheduler(provider, store).run_tick().await.unwrap();
        assert_eq!(
            outcome,
            TickOutcome::Completed(TickReport {
                written: 0,
                inactive: 2,
                failed: 0
            })
        );
    }

    #[tokio::test]
    async fn one_failing_device_does_not_stop_the_tick() {
        let mut provider = MockTelemetryProvider::new();
        provider
            .expect_device_directory()
            .returning(|| Ok(vec![info("a", true), info("b", true)]));
        provider
            .expect_fetch_timeseries()
            .withf(|id, _| id == "a")
            .returning(|_, _| {
                Err(ProviderError::Status {
                    endpoint: "/timeseries".into(),
                    status: 500,
                    body: String::new(),
                })
            });
        provider
            .expect_fetch_timeseries()
            .withf(|id, keys| id == "b" && keys == LogSample::KEYS)
            .returning(|_, _| Ok(current(3.5)));

        let mut store = MockTelemetryStore::new();
        store
            .expect_list_devices()
            .returning(|| Ok(vec![cached("a"), cached("b")]));
        store
            .expect_insert_log()
            .withf(|entry| {
                entry.tb_device_id == "b"
                    && entry.device_code.as_deref() == Some("code-b")
                    && entry.sample.motor_current == Some(3.5)
                    && entry.sample.rpm.is_none()
            })
            .times(1)
            .returning(|_| Ok(()));

        let outcome = scheduler(provider, store).run_tick().await.unwrap();
        assert_eq!(
            outcome,
            TickOutcome::Completed(TickReport {
                written: 1,
                inactive: 0,
                failed: 1
            })
        );
    }

    #[tokio::test]
    async fn directory_failure_aborts_tick() {
        let mut provider = MockTelemetryProvider::new();
        provider
            .expect_device_directory()
            .returning(|| Err(ProviderError::Timeout("directory".into())));
        let mut store = MockTelemetryStore::new();
        store.expect_list_devices().never();
        store.expect_insert_log().never();

        let result = scheduler(provider, store).run_tick().await;
        assert!(matches!(result, Err(ServiceError::Provider(_))));
    }

    #[tokio::test]
    async fn paused_tick_does_nothing() {
        let mut provider = MockTelemetryProvider::new();
        provider.expect_device_directory().never();
        let scheduler = scheduler(provider, MockTelemetryStore::new());

        scheduler.set_autosave(false);
        assert_eq!(scheduler.run_tick().await.unwrap(), TickOutcome::Paused);
        assert!(!scheduler.autosave_enabled());
    }

    #[tokio::test]
    async fn busy_scheduler_skips_tick() {
        let mut provider = MockTelemetryProvider::new();
        provider.expect_device_directory().never();
        let scheduler = scheduler(provider, MockTelemetryStore::new());

        let _held = BusyGuard::acquire(&scheduler.busy).unwrap();
        assert_eq!(scheduler.run_tick().await.unwrap(), TickOutcome::Skipped);
    }

    #[test]
    fn busy_guard_releases_on_drop() {
        let flag = AtomicBool::new(false);
        {
            let _guard = BusyGuard::acquire(&flag).unwrap();
            assert!(BusyGuard::acquire(&flag).is_none());
        }
        assert!(BusyGuard::acquire(&flag).is_some());
    }
}
