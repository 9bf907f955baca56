pub mod manager;
pub mod models;
pub mod schema;
pub mod store;

pub use manager::{DatabaseError, DatabaseManager};
pub use store::{PgTelemetryStore, TelemetryStore};
#[cfg(test)]
pub use store::MockTelemetryStore;
