use async_trait::async_trait;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use sqlx::PgPool;

use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::{
    DeviceLogEntry, DeviceRecord, DeviceWithOwner, LatestLogRow, NewLogEntry, TelemetrySnapshot, TimeRange,
};
use crate::telemetry::{DeviceMetadata, LogSample, SignalRecord, SnapshotValues};

/// Persistence used by sync, polling and reporting
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TelemetryStore: Send + Sync {
    async fn ping(&self) -> Result<(), DatabaseError>;

    // writes
    async fn upsert_device(&self, device: &DeviceRecord) -> Result<(), DatabaseError>;
    /// Create the row or refresh only its name, keeping cached metadata
    async fn upsert_device_name(&self, tb_device_id: &str, device_name: &str) -> Result<(), DatabaseError>;
    async fn upsert_snapshot(&self, snapshot: &TelemetrySnapshot) -> Result<(), DatabaseError>;
    async fn insert_log(&self, entry: &NewLogEntry) -> Result<(), DatabaseError>;
    async fn assign_device(&self, user_id: i64, tb_device_id: &str) -> Result<(), DatabaseError>;

    // devices
    async fn get_device(&self, tb_device_id: &str) -> Result<Option<DeviceRecord>, DatabaseError>;
    async fn list_devices(&self) -> Result<Vec<DeviceRecord>, DatabaseError>;
    async fn list_devices_with_owner(&self) -> Result<Vec<DeviceWithOwner>, DatabaseError>;
    async fn assigned_device_ids(&self) -> Result<Vec<String>, DatabaseError>;
    async fn owner_address(&self, tb_device_id: &str) -> Result<Option<String>, DatabaseError>;
    async fn find_user_id(&self, address: &str) -> Result<Option<i64>, DatabaseError>;

    // snapshots
    async fn get_snapshot(&self, tb_device_id: &str) -> Result<Option<TelemetrySnapshot>, DatabaseError>;
    async fn snapshots_for_owner(&self, address: &str) -> Result<Vec<TelemetrySnapshot>, DatabaseError>;

    // logs
    async fn latest_per_device(&self) -> Result<Vec<LatestLogRow>, DatabaseError>;
    async fn latest_for_supervisor(&self, supervisor_id: &str) -> Result<Vec<LatestLogRow>, DatabaseError>;
    async fn logs_in_range(&self, tb_device_id: &str, range: &TimeRange) -> Result<Vec<DeviceLogEntry>, DatabaseError>;
    async fn all_logs_in_range(&self, range: &TimeRange) -> Result<Vec<DeviceLogEntry>, DatabaseError>;
    async fn last_log_time(&self, tb_device_id: &str) -> Result<Option<DateTime<Utc>>, DatabaseError>;
}

/// `INSERT .. ON CONFLICT (key) DO UPDATE` touching every listed column.
/// Placeholders are numbered key first, then `columns` in order.
pub fn upsert_statement(table: &str, key: &str, columns: &[&str]) -> String {
    let placeholders: Vec<String> = (1..=columns.len() + 1).map(|i| format!("${}", i)).collect();
    let updates: Vec<String> = columns
        .iter()
        .map(|column| format!("{column} = EXCLUDED.{column}"))
        .collect();

    format!(
        "INSERT INTO {table} ({key}, {}) VALUES ({}) ON CONFLICT ({key}) DO UPDATE SET {}",
        columns.join(", "),
        placeholders.join(", "),
        updates.join(", ")
    )
}

fn insert_statement(table: &str, columns: &[&str]) -> String {
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("${}", i)).collect();
    format!(
        "INSERT INTO {table} ({}) VALUES ({})",
        columns.join(", "),
        placeholders.join(", ")
    )
}

static DEVICE_COLUMNS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    std::iter::once("device_name")
        .chain(DeviceMetadata::COLUMNS.iter().copied())
        .collect()
});

static UPSERT_DEVICE: Lazy<String> = Lazy::new(|| upsert_statement("devices", "tb_device_id", &DEVICE_COLUMNS));

static UPSERT_DEVICE_NAME: Lazy<String> = Lazy::new(|| upsert_statement("devices", "tb_device_id", &["device_name"]));

static UPSERT_SNAPSHOT: Lazy<String> =
    Lazy::new(|| upsert_statement("telemetry_device", "tb_device_id", SnapshotValues::COLUMNS));

static INSERT_LOG: Lazy<String> = Lazy::new(|| {
    let columns: Vec<&str> = ["tb_device_id", "device_code"]
        .into_iter()
        .chain(LogSample::COLUMNS.iter().copied())
        .collect();
    insert_statement("device_logs", &columns)
});

static DEVICE_SELECT: Lazy<String> = Lazy::new(|| {
    std::iter::once("tb_device_id")
        .chain(DEVICE_COLUMNS.iter().copied())
        .map(|c| format!("d.{c}"))
        .collect::<Vec<_>>()
        .join(", ")
});

static LOG_COLUMNS: Lazy<String> = Lazy::new(|| {
    ["id", "tb_device_id", "device_code"]
        .into_iter()
        .chain(LogSample::COLUMNS.iter().copied())
        .chain(std::iter::once("log_time"))
        .map(|c| format!("l.{c}"))
        .collect::<Vec<_>>()
        .join(", ")
});

/// One owner per device even when several users claimed it.
/// `device_col` is the qualified device id column of the outer query.
fn owner_join(device_col: &str) -> String {
    format!(
        "LEFT JOIN LATERAL (
        SELECT u.address FROM user_devices ud
        JOIN users u ON u.id = ud.user_id
        WHERE ud.tb_device_id = {device_col}
        ORDER BY ud.id
        LIMIT 1
    ) owner ON TRUE"
    )
}

/// Postgres implementation backed by the shared pool
#[derive(Clone)]
pub struct PgTelemetryStore {
    pool: PgPool,
}

impl PgTelemetryStore {
    pub fn new(db: &DatabaseManager) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }

    fn latest_sql(filter: &str) -> String {
        format!(
            "SELECT {cols}, dev.device_name, dev.location AS city, owner.address
             FROM (
                SELECT DISTINCT ON (tb_device_id) *
                FROM device_logs
                {filter}
                ORDER BY tb_device_id, log_time DESC, id DESC
             ) l
             LEFT JOIN devices dev ON dev.tb_device_id = l.tb_device_id
             {owner}
             ORDER BY l.tb_device_id",
            cols = LOG_COLUMNS.as_str(),
            filter = filter,
            owner = owner_join("l.tb_device_id"),
        )
    }
}

#[async_trait]
impl TelemetryStore for PgTelemetryStore {
    async fn ping(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn upsert_device(&self, device: &DeviceRecord) -> Result<(), DatabaseError> {
        let query = sqlx::query(UPSERT_DEVICE.as_str())
            .bind(device.tb_device_id.clone())
            .bind(device.device_name.clone());
        device.metadata.bind_into(query).execute(&self.pool).await?;
        Ok(())
    }

    async fn upsert_device_name(&self, tb_device_id: &str, device_name: &str) -> Result<(), DatabaseError> {
        sqlx::query(UPSERT_DEVICE_NAME.as_str())
            .bind(tb_device_id)
            .bind(device_name)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn upsert_snapshot(&self, snapshot: &TelemetrySnapshot) -> Result<(), DatabaseError> {
        let query = sqlx::query(UPSERT_SNAPSHOT.as_str()).bind(snapshot.tb_device_id.clone());
        snapshot.values.bind_into(query).execute(&self.pool).await?;
        Ok(())
    }

    async fn insert_log(&self, entry: &NewLogEntry) -> Result<(), DatabaseError> {
        let query = sqlx::query(INSERT_LOG.as_str())
            .bind(entry.tb_device_id.clone())
            .bind(entry.device_code.clone());
        entry.sample.bind_into(query).execute(&self.pool).await?;
        Ok(())
    }

    async fn assign_device(&self, user_id: i64, tb_device_id: &str) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO user_devices (user_id, tb_device_id) VALUES ($1, $2)
             ON CONFLICT (user_id, tb_device_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(tb_device_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_device(&self, tb_device_id: &str) -> Result<Option<DeviceRecord>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM devices d WHERE d.tb_device_id = $1",
            DEVICE_SELECT.as_str()
        );
        let row = sqlx::query_as::<_, DeviceRecord>(&sql)
            .bind(tb_device_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list_devices(&self) -> Result<Vec<DeviceRecord>, DatabaseError> {
        let sql = format!("SELECT {} FROM devices d ORDER BY d.tb_device_id", DEVICE_SELECT.as_str());
        let rows = sqlx::query_as::<_, DeviceRecord>(&sql).fetch_all(&self.pool).await?;
        Ok(rows)
    }

    async fn list_devices_with_owner(&self) -> Result<Vec<DeviceWithOwner>, DatabaseError> {
        let sql = format!(
            "SELECT {}, owner.address FROM devices d {} ORDER BY d.tb_device_id",
            DEVICE_SELECT.as_str(),
            owner_join("d.tb_device_id")
        );
        let rows = sqlx::query_as::<_, DeviceWithOwner>(&sql).fetch_all(&self.pool).await?;
        Ok(rows)
    }

    async fn assigned_device_ids(&self) -> Result<Vec<String>, DatabaseError> {
        let ids = sqlx::query_scalar::<_, String>("SELECT DISTINCT tb_device_id FROM user_devices")
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    async fn owner_address(&self, tb_device_id: &str) -> Result<Option<String>, DatabaseError> {
        let address = sqlx::query_scalar::<_, String>(
            "SELECT u.address FROM user_devices ud
             JOIN users u ON u.id = ud.user_id
             WHERE ud.tb_device_id = $1
             ORDER BY ud.id
             LIMIT 1",
        )
        .bind(tb_device_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(address)
    }

    async fn find_user_id(&self, address: &str) -> Result<Option<i64>, DatabaseError> {
        let id = sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE address = $1")
            .bind(address)
            .fetch_optional(&self.pool)
            .await?;
        Ok(id)
    }

    async fn get_snapshot(&self, tb_device_id: &str) -> Result<Option<TelemetrySnapshot>, DatabaseError> {
        let row = sqlx::query_as::<_, TelemetrySnapshot>("SELECT * FROM telemetry_device WHERE tb_device_id = $1")
            .bind(tb_device_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn snapshots_for_owner(&self, address: &str) -> Result<Vec<TelemetrySnapshot>, DatabaseError> {
        let rows = sqlx::query_as::<_, TelemetrySnapshot>(
            "SELECT t.* FROM telemetry_device t
             JOIN user_devices ud ON ud.tb_device_id = t.tb_device_id
             JOIN users u ON u.id = ud.user_id
             WHERE u.address = $1
             ORDER BY t.tb_device_id",
        )
        .bind(address)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn latest_per_device(&self) -> Result<Vec<LatestLogRow>, DatabaseError> {
        let sql = Self::latest_sql("");
        let rows = sqlx::query_as::<_, LatestLogRow>(&sql).fetch_all(&self.pool).await?;
        Ok(rows)
    }

    async fn latest_for_supervisor(&self, supervisor_id: &str) -> Result<Vec<LatestLogRow>, DatabaseError> {
        let sql = Self::latest_sql(
            "WHERE tb_device_id IN (
                SELECT ud.tb_device_id FROM user_devices ud
                JOIN users u ON u.id = ud.user_id
                WHERE u.supervisor_id = $1
             )",
        );
        let rows = sqlx::query_as::<_, LatestLogRow>(&sql)
            .bind(supervisor_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn logs_in_range(&self, tb_device_id: &str, range: &TimeRange) -> Result<Vec<DeviceLogEntry>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM device_logs l
             WHERE l.tb_device_id = $1 AND l.log_time BETWEEN $2 AND $3
             ORDER BY l.log_time, l.id",
            LOG_COLUMNS.as_str()
        );
        let rows = sqlx::query_as::<_, DeviceLogEntry>(&sql)
            .bind(tb_device_id)
            .bind(range.from)
            .bind(range.to)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn all_logs_in_range(&self, range: &TimeRange) -> Result<Vec<DeviceLogEntry>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM device_logs l
             WHERE l.log_time BETWEEN $1 AND $2
             ORDER BY l.tb_device_id, l.log_time, l.id",
            LOG_COLUMNS.as_str()
        );
        let rows = sqlx::query_as::<_, DeviceLogEntry>(&sql)
            .bind(range.from)
            .bind(range.to)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn last_log_time(&self, tb_device_id: &str) -> Result<Option<DateTime<Utc>>, DatabaseError> {
        let at = sqlx::query_scalar::<_, Option<DateTime<Utc>>>(
            "SELECT MAX(log_time) FROM device_logs WHERE tb_device_id = $1",
        )
        .bind(tb_device_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(at)
    }
}
