use anyhow::Context;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::database::{DatabaseManager, PgTelemetryStore, TelemetryStore};
use crate::provider::{TelemetryProvider, ThingsBoardClient};
use crate::services::{FleetFilter, FleetSyncService, PollingScheduler, ReportService};

/// Shared handles injected into every handler
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn TelemetryStore>,
    pub sync: Arc<FleetSyncService>,
    pub scheduler: Arc<PollingScheduler>,
    pub reports: Arc<ReportService>,
}

impl AppState {
    /// Wire the services around one provider and one store
    pub fn new(
        config: &AppConfig,
        provider: Arc<dyn TelemetryProvider>,
        store: Arc<dyn TelemetryStore>,
    ) -> Self {
        let sync = FleetSyncService::new(
            provider.clone(),
            store.clone(),
            FleetFilter::new(&config.provider.fleet_marker),
            config.scheduler.sync_concurrency,
        );
        let scheduler = PollingScheduler::new(provider, store.clone(), &config.scheduler);
        let reports = ReportService::new(store.clone(), config.export.max_devices);

        Self {
            store,
            sync: Arc::new(sync),
            scheduler: Arc::new(scheduler),
            reports: Arc::new(reports),
        }
    }
}

/// Connect to the database and the provider and wire the services
pub async fn bootstrap(config: &AppConfig) -> anyhow::Result<(DatabaseManager, AppState)> {
    let db = DatabaseManager::connect(&config.database)
        .await
        .context("failed to connect to database")?;
    db.ensure_schema().await.context("failed to apply schema")?;

    let provider = ThingsBoardClient::new(&config.provider).context("invalid provider configuration")?;
    let store = PgTelemetryStore::new(&db);

    let state = AppState::new(config, Arc::new(provider), Arc::new(store));
    Ok((db, state))
}
