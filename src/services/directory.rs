use std::collections::HashMap;
use tracing::warn;

use crate::provider::{DeviceInfo, ProviderError, TelemetryProvider};

/// Name-based fleet membership: a device belongs when its name contains the marker,
/// ignoring case
#[derive(Debug, Clone)]
pub struct FleetFilter {
    marker: String,
}

impl FleetFilter {
    pub fn new(marker: &str) -> Self {
        Self {
            marker: marker.to_lowercase(),
        }
    }

    pub fn matches(&self, device_name: &str) -> bool {
        device_name.to_lowercase().contains(&self.marker)
    }

    pub fn apply(&self, devices: Vec<DeviceInfo>) -> Vec<DeviceInfo> {
        devices
            .into_iter()
            .filter(|device| {
                let keep = self.matches(&device.device_name);
                if !keep {
                    warn!(device = %device.tb_device_id, name = %device.device_name, "Skipping device outside the fleet");
                }
                keep
            })
            .collect()
    }
}

/// The directory narrowed to fleet devices
pub async fn fleet_devices(
    provider: &dyn TelemetryProvider,
    filter: &FleetFilter,
) -> Result<Vec<DeviceInfo>, ProviderError> {
    let directory = provider.device_directory().await?;
    Ok(filter.apply(directory))
}

/// Device id -> provider liveness flag
pub fn liveness_map(devices: &[DeviceInfo]) -> HashMap<String, bool> {
    devices
        .iter()
        .map(|device| (device.tb_device_id.clone(), device.active))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MockTelemetryProvider;

    fn device(id: &str, name: &str, active: bool) -> DeviceInfo {
        DeviceInfo {
            tb_device_id: id.to_string(),
            device_name: name.to_string(),
            active,
        }
    }

    #[test]
    fn marker_match_ignores_case() {
        let filter = FleetFilter::new("lift");
        assert!(filter.matches("Lift-East-03"));
        assert!(filter.matches("SERVICE LIFT"));
        assert!(filter.matches("forklift"));
        assert!(!filter.matches("Conveyor-12"));
    }

    #[derive(Clone, Default)]
    struct Captured(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn filtered_devices_are_warned_about() {
        let captured = Captured::default();
        let sink = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || sink.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();

        let kept = tracing::subscriber::with_default(subscriber, || {
            FleetFilter::new("lift").apply(vec![
                device("c-12", "Conveyor-12", true),
                device("l-03", "Lift-East-03", true),
            ])
        });
        assert_eq!(kept.len(), 1);

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("WARN"));
        assert!(output.contains("c-12"));
        assert!(!output.contains("l-03"));
    }

    #[tokio::test]
    async fn fleet_excludes_other_devices() {
        let mut provider = MockTelemetryProvider::new();
        provider.expect_device_directory().times(1).returning(|| {
            Ok(vec![
                device("c-12", "Conveyor-12", true),
                device("l-03", "Lift-East-03", false),
            ])
        });

        let fleet = fleet_devices(&provider, &FleetFilter::new("LIFT")).await.unwrap();
        assert_eq!(fleet.len(), 1);
        assert_eq!(fleet[0].tb_device_id, "l-03");
    }

    #[test]
    fn liveness_map_keeps_flags() {
        let map = liveness_map(&[device("a", "Lift A", true), device("b", "Lift B", false)]);
        assert_eq!(map.get("a"), Some(&true));
        assert_eq!(map.get("b"), Some(&false));
        assert_eq!(map.get("c"), None);
    }
}
