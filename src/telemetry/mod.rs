pub mod signals;

pub use signals::{DeviceMetadata, LogSample, SignalRecord, SignalValue, SnapshotValues};
