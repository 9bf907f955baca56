//! ThingsBoard access: token session, device directory and time-series reads.

pub mod client;
pub mod error;
pub mod session;
pub mod types;

use async_trait::async_trait;

pub use client::ThingsBoardClient;
pub use error::ProviderError;
pub use session::{Authenticator, TokenSession};
pub use types::{DeviceInfo, Timeseries, TimeseriesPoint};

/// Read side of the telemetry provider
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TelemetryProvider: Send + Sync {
    /// Every device the account can see, unfiltered
    async fn device_directory(&self) -> Result<Vec<DeviceInfo>, ProviderError>;

    /// Latest samples for the requested keys of one device
    async fn fetch_timeseries(
        &self,
        tb_device_id: &str,
        keys: &'static [&'static str],
    ) -> Result<Timeseries, ProviderError>;
}
