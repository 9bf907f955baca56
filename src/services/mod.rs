pub mod directory;
pub mod export;
pub mod poller;
pub mod reports;
pub mod sync_service;

use thiserror::Error;

use crate::database::DatabaseError;
use crate::provider::ProviderError;

pub use directory::FleetFilter;
pub use export::{ExportError, ExportFormat, ExportPayload};
pub use poller::{PollingScheduler, TickOutcome, TickReport};
pub use reports::ReportService;
pub use sync_service::{FleetSyncService, SyncReport};

/// Failures surfaced by the sync, polling and reporting services
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error("Device {0} is not part of the managed fleet")]
    NotInFleet(String),

    #[error("No user found with address {0}")]
    UnknownUser(String),

    #[error("{0}")]
    InvalidInput(String),
}
