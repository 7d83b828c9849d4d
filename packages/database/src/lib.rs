#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Embedded scenario store backed by `DuckDB`.
//!
//! Holds the handful of tables the scenario setup and analysis code reads
//! and writes: scenario and project files, scenario source data, scenario
//! settings, admin areas, origins with their indicators, raw travel-time
//! results and operation logs.
//!
//! Every query is a plain synchronous function taking a
//! [`duckdb::Connection`]. Async callers go through [`Db::run`], which moves
//! the work onto the blocking thread pool so long scans never stall the
//! runtime.

pub mod admin_areas;
pub mod operations;
pub mod results;
pub mod scenario_files;
pub mod settings;
pub mod source_data;

use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveDateTime, Utc};
use duckdb::Connection;

/// Errors that can occur during database operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// `DuckDB` query error.
    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    /// I/O error while preparing the database directory.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The blocking task running a query panicked or was cancelled.
    #[error("Database task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// A previous query panicked while holding the connection.
    #[error("Database connection lock poisoned")]
    Poisoned,

    /// Data conversion error.
    #[error("Data conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}

/// Shared handle to the scenario store.
///
/// `duckdb::Connection` is `Send` but not `Sync`, so the connection is
/// wrapped in a `Mutex`. Cloning the handle is cheap and all clones share
/// the same connection.
#[derive(Clone)]
pub struct Db {
    conn: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for Db {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Db").finish_non_exhaustive()
    }
}

impl Db {
    /// Opens (or creates) the store at `path` and ensures the schema exists.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the directory, connection or schema creation
    /// fails.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("SET threads = 4; SET memory_limit = '1GB';")?;
        create_schema(&conn)?;

        log::debug!("Opened scenario store at {}", path.display());

        Ok(Self::from_connection(conn))
    }

    /// Opens a throwaway in-memory store with the schema applied.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the connection or schema creation fails.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        create_schema(&conn)?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Runs `f` against the connection on the blocking thread pool.
    ///
    /// # Errors
    ///
    /// Returns whatever `f` returns, or [`DbError::Join`] /
    /// [`DbError::Poisoned`] if the task could not run to completion.
    pub async fn run<T, F>(&self, f: F) -> Result<T, DbError>
    where
        F: FnOnce(&mut Connection) -> Result<T, DbError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().map_err(|_| DbError::Poisoned)?;
            f(&mut guard)
        })
        .await?
    }
}

fn create_schema(conn: &Connection) -> Result<(), DbError> {
    conn.execute_batch(
        "CREATE SEQUENCE IF NOT EXISTS scenarios_files_id_seq START 1;
        CREATE TABLE IF NOT EXISTS scenarios_files (
            id BIGINT PRIMARY KEY DEFAULT nextval('scenarios_files_id_seq'),
            project_id BIGINT NOT NULL,
            scenario_id BIGINT NOT NULL,
            name TEXT NOT NULL,
            file_type TEXT NOT NULL,
            subtype TEXT,
            path TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL,
            updated_at TIMESTAMP NOT NULL
        );

        CREATE SEQUENCE IF NOT EXISTS projects_files_id_seq START 1;
        CREATE TABLE IF NOT EXISTS projects_files (
            id BIGINT PRIMARY KEY DEFAULT nextval('projects_files_id_seq'),
            project_id BIGINT NOT NULL,
            name TEXT NOT NULL,
            file_type TEXT NOT NULL,
            path TEXT NOT NULL
        );

        CREATE SEQUENCE IF NOT EXISTS scenarios_source_data_id_seq START 1;
        CREATE TABLE IF NOT EXISTS scenarios_source_data (
            id BIGINT PRIMARY KEY DEFAULT nextval('scenarios_source_data_id_seq'),
            project_id BIGINT NOT NULL,
            scenario_id BIGINT NOT NULL,
            name TEXT NOT NULL,
            source_type TEXT NOT NULL,
            data TEXT
        );

        CREATE TABLE IF NOT EXISTS scenarios_settings (
            scenario_id BIGINT NOT NULL,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL,
            updated_at TIMESTAMP NOT NULL,
            PRIMARY KEY (scenario_id, key)
        );

        CREATE TABLE IF NOT EXISTS projects_aa (
            id BIGINT PRIMARY KEY,
            project_id BIGINT NOT NULL,
            name TEXT NOT NULL,
            aa_type TEXT,
            geometry TEXT
        );

        CREATE TABLE IF NOT EXISTS projects_origins (
            id BIGINT PRIMARY KEY,
            project_id BIGINT NOT NULL,
            name TEXT NOT NULL,
            longitude DOUBLE,
            latitude DOUBLE
        );

        CREATE TABLE IF NOT EXISTS projects_origins_indicators (
            origin_id BIGINT NOT NULL,
            key TEXT NOT NULL,
            label TEXT,
            value DOUBLE,
            PRIMARY KEY (origin_id, key)
        );

        CREATE TABLE IF NOT EXISTS results (
            id BIGINT PRIMARY KEY,
            project_id BIGINT NOT NULL,
            scenario_id BIGINT NOT NULL,
            origin_id BIGINT NOT NULL,
            project_aa_id BIGINT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS results_poi (
            result_id BIGINT NOT NULL,
            poi_type TEXT NOT NULL,
            travel_time BIGINT,
            PRIMARY KEY (result_id, poi_type)
        );

        CREATE SEQUENCE IF NOT EXISTS operations_id_seq START 1;
        CREATE TABLE IF NOT EXISTS operations (
            id BIGINT PRIMARY KEY DEFAULT nextval('operations_id_seq'),
            name TEXT NOT NULL,
            project_id BIGINT NOT NULL,
            scenario_id BIGINT NOT NULL,
            status TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL,
            updated_at TIMESTAMP NOT NULL
        );

        CREATE SEQUENCE IF NOT EXISTS operations_logs_id_seq START 1;
        CREATE TABLE IF NOT EXISTS operations_logs (
            id BIGINT PRIMARY KEY DEFAULT nextval('operations_logs_id_seq'),
            operation_id BIGINT NOT NULL,
            code TEXT NOT NULL,
            data TEXT,
            created_at TIMESTAMP NOT NULL
        );",
    )?;

    Ok(())
}

/// Formats a timestamp the way it is bound into `TIMESTAMP` columns.
pub(crate) fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S%.6f").to_string()
}

/// Parses a `DuckDB` `TIMESTAMP::TEXT` value into a UTC `DateTime`.
///
/// `DuckDB` omits the fractional part when it is zero, so both
/// `2024-01-15 10:30:00` and `2024-01-15 10:30:00.123` are accepted.
pub(crate) fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, DbError> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
        .map(|naive| DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc))
        .map_err(|e| DbError::Conversion {
            message: format!("Invalid timestamp {s:?}: {e}"),
        })
}
