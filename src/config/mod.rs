use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub provider: ProviderConfig,
    pub scheduler: SchedulerConfig,
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

/// ThingsBoard connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub base_url: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub page_size: u32,
    /// Case-insensitive substring a device name must contain to belong to the fleet
    pub fleet_marker: String,
    pub request_timeout_secs: u64,
    /// How long a freshly issued token is trusted. Kept below the provider's
    /// one hour validity so a request never races the real expiry.
    pub token_cache_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub interval_secs: u64,
    pub autosave_enabled: bool,
    pub device_timeout_secs: u64,
    pub sync_on_startup: bool,
    pub sync_concurrency: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    pub max_devices: usize,
}

impl ProviderConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_cache_secs)
    }
}

impl SchedulerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }

    pub fn device_timeout(&self) -> Duration {
        Duration::from_secs(self.device_timeout_secs.max(1))
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Ok(v) = env::var("EMS_API_HOST") {
            self.server.host = v;
        }
        if let Some(port) = env::var("EMS_API_PORT")
            .ok()
            .or_else(|| env::var("PORT").ok())
            .and_then(|s| s.parse::<u16>().ok())
        {
            self.server.port = port;
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v);
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // Provider overrides
        if let Ok(v) = env::var("TB_BASE_URL") {
            self.provider.base_url = v.trim_end_matches('/').to_string();
        }
        if let Ok(v) = env::var("TB_USERNAME") {
            self.provider.username = v;
        }
        if let Ok(v) = env::var("TB_PASSWORD") {
            self.provider.password = v;
        }
        if let Ok(v) = env::var("TB_PAGE_SIZE") {
            self.provider.page_size = v.parse().unwrap_or(self.provider.page_size);
        }
        if let Ok(v) = env::var("TB_FLEET_MARKER") {
            self.provider.fleet_marker = v;
        }
        if let Ok(v) = env::var("TB_REQUEST_TIMEOUT_SECS") {
            self.provider.request_timeout_secs = v.parse().unwrap_or(self.provider.request_timeout_secs);
        }
        if let Ok(v) = env::var("TB_TOKEN_CACHE_SECS") {
            self.provider.token_cache_secs = v.parse().unwrap_or(self.provider.token_cache_secs);
        }

        // Scheduler overrides
        if let Ok(v) = env::var("POLL_INTERVAL_SECS") {
            self.scheduler.interval_secs = v.parse().unwrap_or(self.scheduler.interval_secs);
        }
        if let Ok(v) = env::var("POLL_AUTOSAVE_ENABLED") {
            self.scheduler.autosave_enabled = v.parse().unwrap_or(self.scheduler.autosave_enabled);
        }
        if let Ok(v) = env::var("POLL_DEVICE_TIMEOUT_SECS") {
            self.scheduler.device_timeout_secs = v.parse().unwrap_or(self.scheduler.device_timeout_secs);
        }
        if let Ok(v) = env::var("SYNC_ON_STARTUP") {
            self.scheduler.sync_on_startup = v.parse().unwrap_or(self.scheduler.sync_on_startup);
        }
        if let Ok(v) = env::var("SYNC_CONCURRENCY") {
            self.scheduler.sync_concurrency = v.parse().unwrap_or(self.scheduler.sync_concurrency);
        }

        // Export overrides
        if let Ok(v) = env::var("EXPORT_MAX_DEVICES") {
            self.export.max_devices = v.parse().unwrap_or(self.export.max_devices);
        }

        self
    }

    fn provider_defaults() -> ProviderConfig {
        ProviderConfig {
            base_url: "https://thingsboard.cloud".to_string(),
            username: String::new(),
            password: String::new(),
            page_size: 1000,
            fleet_marker: "lift".to_string(),
            request_timeout_secs: 10,
            token_cache_secs: 55 * 60,
        }
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 5,
                connection_timeout: 30,
            },
            provider: Self::provider_defaults(),
            scheduler: SchedulerConfig {
                interval_secs: 60,
                autosave_enabled: true,
                device_timeout_secs: 15,
                sync_on_startup: true,
                sync_concurrency: 4,
            },
            export: ExportConfig { max_devices: 10 },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 10,
            },
            provider: Self::provider_defaults(),
            scheduler: SchedulerConfig {
                interval_secs: 60,
                autosave_enabled: true,
                device_timeout_secs: 15,
                sync_on_startup: true,
                sync_concurrency: 4,
            },
            export: ExportConfig { max_devices: 10 },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
                connection_timeout: 5,
            },
            provider: ProviderConfig {
                request_timeout_secs: 5,
                ..Self::provider_defaults()
            },
            scheduler: SchedulerConfig {
                interval_secs: 60,
                autosave_enabled: true,
                device_timeout_secs: 10,
                sync_on_startup: true,
                sync_concurrency: 8,
            },
            export: ExportConfig { max_devices: 10 },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[macro_export]
macro_rules! is_production {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Production)
    };
}
