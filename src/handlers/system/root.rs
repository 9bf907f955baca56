use axum::response::Json;
use serde_json::{json, Value};

/// GET / - Service banner and endpoint map
pub async fn get() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "EMS API (Rust)",
            "version": version,
            "description": "Elevator fleet telemetry cache and reporting backend",
            "endpoints": {
                "health": "/health",
                "logs": "/api/logs/latest, /api/logs/supervisor-latest, /api/logs/download-selected, /api/logs/download-all",
                "autosave": "/api/logs/autosave (GET, PUT)",
                "sync": "/api/sync-now, /api/device/:tb_device_id/sync-telemetry",
                "devices": "/api/devices, /api/unassigned-devices, /api/user-devices-details/:address, /api/assign-device",
            }
        }
    }))
}
