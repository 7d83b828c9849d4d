//! Persisted progress log for long-running setup operations.

use chrono::Utc;
use duckdb::{Connection, params};
use ram_database_models::{Operation, OperationLog, OperationStatus};

use crate::{DbError, format_timestamp};

/// Starts a new operation in the `running` state and returns its id.
///
/// # Errors
///
/// Returns [`DbError`] if the insert fails.
pub fn create_operation(
    conn: &Connection,
    name: &str,
    project_id: i64,
    scenario_id: i64,
) -> Result<i64, DbError> {
    let now = format_timestamp(&Utc::now());
    let id = conn.query_row(
        "INSERT INTO operations (name, project_id, scenario_id, status, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?)
         RETURNING id",
        params![
            name,
            project_id,
            scenario_id,
            OperationStatus::Running.as_ref(),
            now,
            now
        ],
        |row| row.get(0),
    )?;
    Ok(id)
}

/// Appends a log entry to an operation.
///
/// # Errors
///
/// Returns [`DbError`] if the insert fails.
pub fn log_operation(
    conn: &Connection,
    operation_id: i64,
    code: &str,
    data: Option<&str>,
) -> Result<(), DbError> {
    let now = format_timestamp(&Utc::now());
    conn.execute(
        "INSERT INTO operations_logs (operation_id, code, data, created_at) VALUES (?, ?, ?, ?)",
        params![operation_id, code, data, now],
    )?;
    conn.execute(
        "UPDATE operations SET updated_at = ? WHERE id = ?",
        params![now, operation_id],
    )?;
    Ok(())
}

/// Moves an operation out of `running` into its final `status`.
///
/// # Errors
///
/// Returns [`DbError`] if the update fails.
pub fn finish_operation(
    conn: &Connection,
    operation_id: i64,
    status: OperationStatus,
) -> Result<(), DbError> {
    conn.execute(
        "UPDATE operations SET status = ?, updated_at = ? WHERE id = ?",
        params![
            status.as_ref(),
            format_timestamp(&Utc::now()),
            operation_id
        ],
    )?;
    Ok(())
}

/// Loads an operation by id.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails or the stored status is unknown.
pub fn get_operation(conn: &Connection, operation_id: i64) -> Result<Option<Operation>, DbError> {
    let mut stmt = conn
        .prepare("SELECT id, name, project_id, scenario_id, status FROM operations WHERE id = ?")?;
    let mut rows = stmt.query(params![operation_id])?;
    let Some(row) = rows.next()? else {
        return Ok(None);
    };

    let status: String = row.get(4)?;

    Ok(Some(Operation {
        id: row.get(0)?,
        name: row.get(1)?,
        project_id: row.get(2)?,
        scenario_id: row.get(3)?,
        status: status.parse().map_err(|_| DbError::Conversion {
            message: format!("Unknown operation status {status:?}"),
        })?,
    }))
}

/// Returns an operation's log entries in the order they were written.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn get_operation_logs(
    conn: &Connection,
    operation_id: i64,
) -> Result<Vec<OperationLog>, DbError> {
    let mut stmt = conn.prepare(
        "SELECT id, operation_id, code, data FROM operations_logs
         WHERE operation_id = ?
         ORDER BY id",
    )?;

    let logs = stmt
        .query_map(params![operation_id], |row| {
            Ok(OperationLog {
                id: row.get(0)?,
                operation_id: row.get(1)?,
                code: row.get(2)?,
                data: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(logs)
}
