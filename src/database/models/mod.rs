pub mod device;
pub mod device_log;
pub mod snapshot;

pub use device::{DeviceRecord, DeviceWithOwner, UnassignedDevice};
pub use device_log::{DeviceLogEntry, LatestLogRow, NewLogEntry, TimeRange};
pub use snapshot::TelemetrySnapshot;
