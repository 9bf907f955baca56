//! Relational cache DDL, applied at startup.
//!
//! `supervisors`, `users` and `user_devices` belong to the account layer; they are
//! declared here only so the owner and supervisor joins have something to read.

pub const STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS devices (
        tb_device_id TEXT PRIMARY KEY,
        device_name  TEXT,
        device_code  TEXT,
        mac_address  TEXT,
        serial_num   TEXT,
        location     TEXT,
        status       TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS telemetry_device (
        tb_device_id      TEXT PRIMARY KEY,
        mac_address       TEXT,
        serial_num        TEXT,
        location          TEXT,
        status            TEXT,
        device_code       TEXT,
        error_code        TEXT,
        cfl               TEXT,
        position          TEXT,
        speed             TEXT,
        rpm               TEXT,
        bus_voltage       TEXT,
        motor_current     TEXT,
        controller_id     TEXT,
        signal_quality    TEXT,
        latitude          TEXT,
        longitude         TEXT,
        work_time         TEXT,
        work_count        TEXT,
        direction_changes TEXT,
        direction_count   TEXT,
        travel_time       TEXT,
        door_a            TEXT,
        door_b            TEXT,
        read_time         TEXT,
        stop_count        TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS device_logs (
        id            BIGSERIAL PRIMARY KEY,
        tb_device_id  TEXT NOT NULL,
        device_code   TEXT,
        motor_current DOUBLE PRECISION,
        bus_voltage   DOUBLE PRECISION,
        speed         DOUBLE PRECISION,
        rpm           DOUBLE PRECISION,
        position      DOUBLE PRECISION,
        log_time      TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS device_logs_device_time_idx ON device_logs (tb_device_id, log_time)",
    r#"
    CREATE TABLE IF NOT EXISTS supervisors (
        supervisor_id TEXT PRIMARY KEY,
        first_name    TEXT,
        last_name     TEXT,
        email         TEXT,
        phone         TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id            BIGSERIAL PRIMARY KEY,
        address       TEXT NOT NULL UNIQUE,
        first_name    TEXT,
        last_name     TEXT,
        email         TEXT,
        phone         TEXT,
        supervisor_id TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS user_devices (
        id           BIGSERIAL PRIMARY KEY,
        user_id      BIGINT NOT NULL,
        tb_device_id TEXT NOT NULL,
        UNIQUE (user_id, tb_device_id)
    )
    "#,
];
