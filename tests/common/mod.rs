#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use ems_api_rust::config::{AppConfig, DatabaseConfig, ProviderConfig};
use ems_api_rust::database::DatabaseManager;

pub const USERNAME: &str = "tenant@ems.test";
pub const PASSWORD: &str = "secret";

/// In-process stand-in for a ThingsBoard tenant
pub struct FakeThingsBoard {
    pub base_url: String,
    state: Arc<FakeState>,
}

#[derive(Default)]
struct FakeState {
    logins: AtomicUsize,
    directory_calls: AtomicUsize,
    devices: Vec<Value>,
    /// device id -> key -> latest value
    telemetry: HashMap<String, HashMap<String, Value>>,
}

impl FakeThingsBoard {
    pub async fn start(devices: Vec<Value>, telemetry: HashMap<String, HashMap<String, Value>>) -> Result<Self> {
        let state = Arc::new(FakeState {
            devices,
            telemetry,
            ..Default::default()
        });

        let app = Router::new()
            .route("/api/auth/login", post(login))
            .route("/api/deviceInfos/all", get(directory))
            .route("/api/plugins/telemetry/DEVICE/:id/values/timeseries", get(timeseries))
            .with_state(state.clone());

        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .context("failed to bind fake provider")?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            base_url: format!("http://127.0.0.1:{}", port),
            state,
        })
    }

    pub fn logins(&self) -> usize {
        self.state.logins.load(Ordering::SeqCst)
    }

    pub fn directory_calls(&self) -> usize {
        self.state.directory_calls.load(Ordering::SeqCst)
    }

    pub fn provider_config(&self) -> ProviderConfig {
        ProviderConfig {
            base_url: self.base_url.clone(),
            username: USERNAME.to_string(),
            password: PASSWORD.to_string(),
            page_size: 1000,
            fleet_marker: "lift".to_string(),
            request_timeout_secs: 5,
            token_cache_secs: 3000,
        }
    }
}

async fn login(State(state): State<Arc<FakeState>>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if body["username"] != USERNAME || body["password"] != PASSWORD {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "message": "Invalid username or password" })));
    }
    let n = state.logins.fetch_add(1, Ordering::SeqCst) + 1;
    (StatusCode::OK, Json(json!({ "token": format!("token-{}", n), "refreshToken": "unused" })))
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("X-Authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("Bearer token-"))
        .unwrap_or(false)
}

async fn directory(State(state): State<Arc<FakeState>>, headers: HeaderMap) -> (StatusCode, Json<Value>) {
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({})));
    }
    state.directory_calls.fetch_add(1, Ordering::SeqCst);
    (StatusCode::OK, Json(json!({ "data": state.devices, "hasNext": false })))
}

async fn timeseries(
    State(state): State<Arc<FakeState>>,
    Path(id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({})));
    }
    let Some(values) = state.telemetry.get(&id) else {
        return (StatusCode::OK, Json(json!({})));
    };

    let keys = query.get("keys").cloned().unwrap_or_default();
    let mut body = serde_json::Map::new();
    for key in keys.split(',') {
        if let Some(value) = values.get(key) {
            body.insert(key.to_string(), json!([{ "ts": 1714557600000i64, "value": value }]));
        }
    }
    (StatusCode::OK, Json(Value::Object(body)))
}

pub fn device(id: &str, name: &str, active: bool) -> Value {
    json!({ "id": { "entityType": "DEVICE", "id": id }, "name": name, "active": active })
}

pub fn telemetry(entries: Vec<(&str, Vec<(&str, Value)>)>) -> HashMap<String, HashMap<String, Value>> {
    entries
        .into_iter()
        .map(|(id, values)| {
            let values = values.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
            (id.to_string(), values)
        })
        .collect()
}

/// Connect to the test database, or `None` when `DATABASE_URL` is not set
pub async fn test_database() -> Option<DatabaseManager> {
    let _ = dotenvy::dotenv();
    let url = std::env::var("DATABASE_URL").ok()?;

    let config = DatabaseConfig {
        url: Some(url),
        max_connections: 2,
        connection_timeout: 10,
    };
    let db = DatabaseManager::connect(&config).await.expect("failed to connect to test database");
    db.ensure_schema().await.expect("failed to apply schema");
    Some(db)
}

/// Ids unique to one test run so parallel tests never share rows
pub fn unique_id(prefix: &str) -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!("{}-{}-{}", prefix, std::process::id(), nanos)
}

pub fn test_config(provider: ProviderConfig) -> AppConfig {
    let mut config = AppConfig::development();
    config.provider = provider;
    config.scheduler.device_timeout_secs = 5;
    config
}

pub async fn eventually<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}
