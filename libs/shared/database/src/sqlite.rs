use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{Sqlite, Transaction};
use tracing::{debug, info};

/// Statements are idempotent so schema bootstrap can run on every start.
const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS patients (
        id BLOB PRIMARY KEY NOT NULL,
        first_name TEXT NOT NULL,
        last_name TEXT NOT NULL,
        birth_date TEXT,
        phone TEXT,
        email TEXT,
        fiscal_code TEXT UNIQUE
    )",
    "CREATE TABLE IF NOT EXISTS doctors (
        id BLOB PRIMARY KEY NOT NULL,
        first_name TEXT NOT NULL,
        last_name TEXT NOT NULL,
        specialty TEXT NOT NULL,
        phone TEXT,
        email TEXT,
        active INTEGER NOT NULL DEFAULT 1
    )",
    "CREATE TABLE IF NOT EXISTS rooms (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        active INTEGER NOT NULL DEFAULT 1
    )",
    "CREATE TABLE IF NOT EXISTS room_equipment (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        room_id INTEGER NOT NULL REFERENCES rooms(id),
        name TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS visit_types (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        duration_minutes INTEGER NOT NULL DEFAULT 30
    )",
    "CREATE TABLE IF NOT EXISTS appointments (
        id BLOB PRIMARY KEY NOT NULL,
        patient_id BLOB NOT NULL REFERENCES patients(id),
        doctor_id BLOB NOT NULL REFERENCES doctors(id),
        visit_type_id INTEGER NOT NULL REFERENCES visit_types(id),
        room_id INTEGER NOT NULL REFERENCES rooms(id),
        start_at TEXT NOT NULL,
        end_at TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'SCHEDULED',
        note TEXT
    )",
    // Cancelled rows stay in the table, so the same-start guard must not
    // count them or a freed slot could never be filled again.
    "CREATE UNIQUE INDEX IF NOT EXISTS uq_appointments_doctor_start
     ON appointments (doctor_id, start_at) WHERE status <> 'CANCELLED'",
    "CREATE UNIQUE INDEX IF NOT EXISTS uq_appointments_room_start
     ON appointments (room_id, start_at) WHERE status <> 'CANCELLED'",
    "CREATE TABLE IF NOT EXISTS waitlist_entries (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        patient_id BLOB NOT NULL REFERENCES patients(id),
        doctor_id BLOB NOT NULL REFERENCES doctors(id),
        visit_type_id INTEGER NOT NULL REFERENCES visit_types(id),
        priority INTEGER NOT NULL DEFAULT 5,
        entered_at TEXT NOT NULL,
        note TEXT
    )",
    "CREATE TABLE IF NOT EXISTS notifications (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        kind TEXT NOT NULL,
        message TEXT NOT NULL,
        created_at TEXT NOT NULL,
        sent_at TEXT,
        appointment_id BLOB REFERENCES appointments(id),
        patient_id BLOB REFERENCES patients(id)
    )",
    "CREATE TABLE IF NOT EXISTS user_accounts (
        id BLOB PRIMARY KEY NOT NULL,
        username TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        active INTEGER NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL
    )",
];

/// Handle to the relational store. Explicitly constructed at process start
/// and passed down to every service; cloning shares the same pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        debug!("Opening database at {}", database_url);

        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// In-memory store for tests. A single connection keeps every caller on
    /// the same database instance.
    pub async fn in_memory() -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.init_schema().await?;
        Ok(db)
    }

    pub async fn init_schema(&self) -> Result<(), sqlx::Error> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        info!("Database schema initialized");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Scoped unit of work: commit on success, rollback on drop at every
    /// other exit path.
    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>, sqlx::Error> {
        self.pool.begin().await
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
