//! Scenario source data: where each scenario input comes from.

use duckdb::{Connection, params};
use ram_database_models::SourceDataRow;

use crate::DbError;

/// Returns the source row describing input `name` (e.g. `road-network`) of
/// the scenario.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn get_source_data(
    conn: &Connection,
    project_id: i64,
    scenario_id: i64,
    name: &str,
) -> Result<Option<SourceDataRow>, DbError> {
    let mut stmt = conn.prepare(
        "SELECT id, project_id, scenario_id, name, source_type, data
         FROM scenarios_source_data
         WHERE project_id = ? AND scenario_id = ? AND name = ?
         ORDER BY id
         LIMIT 1",
    )?;

    let mut rows = stmt.query(params![project_id, scenario_id, name])?;
    let Some(row) = rows.next()? else {
        return Ok(None);
    };

    Ok(Some(SourceDataRow {
        id: row.get(0)?,
        project_id: row.get(1)?,
        scenario_id: row.get(2)?,
        name: row.get(3)?,
        source_type: row.get(4)?,
        data: row.get(5)?,
    }))
}

/// Inserts a source row and returns its id.
///
/// # Errors
///
/// Returns [`DbError`] if the insert fails.
pub fn insert_source_data(
    conn: &Connection,
    project_id: i64,
    scenario_id: i64,
    name: &str,
    source_type: &str,
    data: Option<&str>,
) -> Result<i64, DbError> {
    let id = conn.query_row(
        "INSERT INTO scenarios_source_data (project_id, scenario_id, name, source_type, data)
         VALUES (?, ?, ?, ?, ?)
         RETURNING id",
        params![project_id, scenario_id, name, source_type, data],
        |row| row.get(0),
    )?;
    Ok(id)
}
