use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers;
use crate::state::AppState;

/// Full HTTP surface
pub fn app(state: AppState) -> Router {
    Router::new()
        // Public
        .route("/", get(handlers::system::root_get))
        .route("/health", get(handlers::system::health_get))
        .merge(log_routes())
        .merge(sync_routes())
        .merge(device_routes())
        .merge(unprefixed_routes())
        // Global middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn log_routes() -> Router<AppState> {
    use handlers::logs;

    Router::new()
        .route("/api/logs/latest", get(logs::latest_get))
        .route("/api/logs/supervisor-latest", get(logs::supervisor_latest_get))
        .route("/api/logs/download-selected", get(logs::download_selected))
        .route("/api/logs/download-all", get(logs::download_all))
        .route("/api/logs/autosave", get(logs::autosave_get).put(logs::autosave_put))
}

fn sync_routes() -> Router<AppState> {
    use handlers::sync;

    Router::new()
        .route("/api/sync-now", post(sync::sync_now_post))
        // older clients call the sync under this name
        .route("/api/sync-thingsboard-devices", post(sync::sync_now_post))
        .route("/api/device/:tb_device_id/sync-telemetry", post(sync::device_telemetry_post))
}

/// Same handlers at the unprefixed paths the account layer calls
fn unprefixed_routes() -> Router<AppState> {
    use handlers::{logs, sync};

    Router::new()
        .route("/latest", get(logs::latest_get))
        .route("/supervisor-latest", get(logs::supervisor_latest_get))
        .route("/download-selected", get(logs::download_selected))
        .route("/download-all", get(logs::download_all))
        .route("/sync-now", post(sync::sync_now_post))
}

fn device_routes() -> Router<AppState> {
    use handlers::devices;

    Router::new()
        .route("/api/devices", get(devices::devices_get))
        .route("/api/unassigned-devices", get(devices::unassigned_get))
        .route("/api/user-devices-details/:address", get(devices::owner_details_get))
        .route("/api/assign-device", post(devices::assign_post))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::database::{DatabaseError, MockTelemetryStore};
    use crate::provider::{DeviceInfo, MockTelemetryProvider};
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn router(provider: MockTelemetryProvider, store: MockTelemetryStore) -> Router {
        let state = AppState::new(&AppConfig::development(), Arc::new(provider), Arc::new(store));
        app(state)
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn more_than_ten_ids_is_a_client_error() {
        let mut store = MockTelemetryStore::new();
        store.expect_logs_in_range().never();
        let ids: Vec<String> = (0..11).map(|i| format!("d{i}")).collect();
        let uri = format!(
            "/api/logs/download-selected?ids={}&from=2024-05-01&to=2024-05-02",
            ids.join(",")
        );

        let response = router(MockTelemetryProvider::new(), store)
            .oneshot(get_request(&uri))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert!(body["error"].as_str().unwrap().contains("maximum of 10"));
    }

    #[tokio::test]
    async fn missing_from_is_a_client_error() {
        let response = router(MockTelemetryProvider::new(), MockTelemetryStore::new())
            .oneshot(get_request("/api/logs/download-all?to=2024-05-02"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "Missing from or to date");
    }

    #[tokio::test]
    async fn single_device_download_is_csv_attachment() {
        let mut store = MockTelemetryStore::new();
        store.expect_logs_in_range().returning(|_, _| Ok(vec![]));
        store.expect_owner_address().returning(|_| Ok(None));

        let response = router(MockTelemetryProvider::new(), store)
            .oneshot(get_request(
                "/api/logs/download-selected?ids=d1&from=2024-05-01&to=2024-05-01",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/csv");
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"d1_logs.csv\""
        );
    }

    #[tokio::test]
    async fn database_error_carries_details() {
        let mut store = MockTelemetryStore::new();
        store
            .expect_latest_per_device()
            .returning(|| Err(DatabaseError::Sqlx(sqlx::Error::RowNotFound)));

        let response = router(MockTelemetryProvider::new(), store)
            .oneshot(get_request("/api/logs/latest"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert_eq!(body["error"], "DB error");
        assert!(body["details"].is_string());
    }

    #[tokio::test]
    async fn non_fleet_device_sync_is_rejected() {
        let mut provider = MockTelemetryProvider::new();
        provider.expect_device_directory().returning(|| {
            Ok(vec![DeviceInfo {
                tb_device_id: "c-12".into(),
                device_name: "Conveyor-12".into(),
                active: true,
            }])
        });

        let request = Request::builder()
            .method("POST")
            .uri("/api/device/c-12/sync-telemetry")
            .body(Body::empty())
            .unwrap();
        let response = router(provider, MockTelemetryStore::new())
            .oneshot(request)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn autosave_toggle_round_trip() {
        let state = AppState::new(
            &AppConfig::development(),
            Arc::new(MockTelemetryProvider::new()),
            Arc::new(MockTelemetryStore::new()),
        );
        let request = Request::builder()
            .method("PUT")
            .uri("/api/logs/autosave")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"enabled":false}"#))
            .unwrap();

        let response = app(state.clone()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["data"]["enabled"], false);
        assert!(!state.scheduler.autosave_enabled());
    }

    #[tokio::test]
    async fn unprefixed_paths_reach_the_same_handlers() {
        let mut store = MockTelemetryStore::new();
        store.expect_latest_per_device().returning(|| Ok(vec![]));
        let response = router(MockTelemetryProvider::new(), store)
            .oneshot(get_request("/latest"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, serde_json::json!([]));

        let mut provider = MockTelemetryProvider::new();
        provider.expect_device_directory().returning(|| Ok(vec![]));
        let request = Request::builder()
            .method("POST")
            .uri("/sync-now")
            .body(Body::empty())
            .unwrap();
        let response = router(provider, MockTelemetryStore::new()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["count"], 0);

        let response = router(MockTelemetryProvider::new(), MockTelemetryStore::new())
            .oneshot(get_request("/download-all?to=2024-05-02"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn traversal_ids_are_rejected_before_reading() {
        let mut store = MockTelemetryStore::new();
        store.expect_logs_in_range().never();
        let response = router(MockTelemetryProvider::new(), store)
            .oneshot(get_request(
                "/api/logs/download-selected?ids=..%2F..%2Fetc%2Fcron.d%2Fx,d2&from=2024-05-01&to=2024-05-02",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(json_body(response).await["error"].as_str().unwrap().contains("Invalid device id"));
    }

    #[tokio::test]
    async fn health_reports_database_outage() {
        let mut store = MockTelemetryStore::new();
        store
            .expect_ping()
            .returning(|| Err(DatabaseError::Sqlx(sqlx::Error::PoolTimedOut)));

        let response = router(MockTelemetryProvider::new(), store)
            .oneshot(get_request("/health"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
