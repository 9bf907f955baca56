// handlers/mod.rs - HTTP handlers grouped by resource
//
// system:  banner and health, no /api prefix
// logs:    latest values, exports and the auto-save switch (/api/logs/*)
// sync:    provider pulls triggered on demand
// devices: cached device listing and ownership
pub mod devices;
pub mod logs;
pub mod sync;
pub mod system;
