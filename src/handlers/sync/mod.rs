pub mod device_telemetry;
pub mod sync_now;

pub use device_telemetry::post as device_telemetry_post;
pub use sync_now::post as sync_now_post;
