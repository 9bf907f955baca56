//! Fixed signal schemas pulled from the provider.
//!
//! Each record type is declared once with [`signal_record!`]: the field list is the
//! column list, and every field is paired with the provider key it is read from.
//! Adding a tracked signal means adding one line to the declaration (and the column
//! to the table DDL); the upsert statement and the request key list follow from it.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use sqlx::Postgres;

use crate::provider::Timeseries;

/// Conversion from a raw provider sample value
pub trait SignalValue: Sized {
    fn from_json(raw: &Value) -> Option<Self>;
}

impl SignalValue for String {
    fn from_json(raw: &Value) -> Option<Self> {
        match raw {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

impl SignalValue for f64 {
    fn from_json(raw: &Value) -> Option<Self> {
        match raw {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }
}

/// A flat record of named signals, one nullable value per provider key
pub trait SignalRecord: Sized + Send + Sync {
    /// Provider time-series keys, in column order
    const KEYS: &'static [&'static str];
    /// Cache column names, in the same order as `KEYS`
    const COLUMNS: &'static [&'static str];

    /// Take the most recent sample of every key. Missing keys become `None`.
    fn from_timeseries(tb_device_id: &str, series: &Timeseries) -> Self;

    /// Bind every value, in column order, onto a prepared statement
    fn bind_into<'q>(&self, query: Query<'q, Postgres, PgArguments>) -> Query<'q, Postgres, PgArguments>;
}

macro_rules! signal_record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $( $field:ident : $ty:ty => $key:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
        $vis struct $name {
            $( pub $field: Option<$ty>, )+
        }

        impl SignalRecord for $name {
            const KEYS: &'static [&'static str] = &[ $( $key ),+ ];
            const COLUMNS: &'static [&'static str] = &[ $( stringify!($field) ),+ ];

            fn from_timeseries(tb_device_id: &str, series: &Timeseries) -> Self {
                Self {
                    $( $field: series.latest::<$ty>(tb_device_id, $key), )+
                }
            }

            fn bind_into<'q>(
                &self,
                query: Query<'q, Postgres, PgArguments>,
            ) -> Query<'q, Postgres, PgArguments> {
                query $( .bind(self.$field.clone()) )+
            }
        }
    };
}

signal_record! {
    /// Identity fields refreshed by the directory sync
    pub struct DeviceMetadata {
        device_code: String => "DeviceId",
        mac_address: String => "MacAddress",
        serial_num: String => "SerialNum",
        location: String => "Location",
        status: String => "Status",
    }
}

signal_record! {
    /// Minimal numeric set sampled on every scheduler tick
    pub struct LogSample {
        motor_current: f64 => "CUR",
        bus_voltage: f64 => "VBUS",
        speed: f64 => "SPD",
        rpm: f64 => "RPM",
        position: f64 => "POS",
    }
}

signal_record! {
    /// Full latest-value snapshot used by assignment and live sync
    pub struct SnapshotValues {
        mac_address: String => "MacAddress",
        serial_num: String => "SerialNum",
        location: String => "Location",
        status: String => "Status",
        device_code: String => "DeviceId",
        error_code: String => "ERR",
        cfl: String => "CFL",
        position: String => "POS",
        speed: String => "SPD",
        rpm: String => "RPM",
        bus_voltage: String => "VBUS",
        motor_current: String => "CUR",
        controller_id: String => "ID",
        signal_quality: String => "CSQ",
        latitude: String => "LAT",
        longitude: String => "LNG",
        work_time: String => "TWTIME",
        work_count: String => "TWCOUNT",
        direction_changes: String => "DIRCHG",
        direction_count: String => "DIRCNT",
        travel_time: String => "TRVTIME",
        door_a: String => "DOORA",
        door_b: String => "DOORB",
        read_time: String => "RDTIME",
        stop_count: String => "STPCNT",
    }
}

impl SnapshotValues {
    /// Identity subset, so a live sync can refresh the device row first
    pub fn metadata(&self) -> DeviceMetadata {
        DeviceMetadata {
            device_code: self.device_code.clone(),
            mac_address: self.mac_address.clone(),
            serial_num: self.serial_num.clone(),
            location: self.location.clone(),
            status: self.status.clone(),
        }
    }
}
