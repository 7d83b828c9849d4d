//! Scenario and project file records.
//!
//! File contents live in blob storage; these tables only track the storage
//! path and what each file is. A scenario owns at most one `road-network`
//! file; re-running ingestion deletes the old row before inserting the new
//! one.

use duckdb::{Connection, Row, params};
use ram_database_models::{FileType, NewScenarioFile, ProjectFile, ScenarioFile};

use crate::{DbError, format_timestamp, parse_timestamp};

const SCENARIO_FILE_COLUMNS: &str = "id, project_id, scenario_id, name, file_type, subtype, path,
     created_at::TEXT, updated_at::TEXT";

fn parse_file_type(value: &str) -> Result<FileType, DbError> {
    value.parse().map_err(|_| DbError::Conversion {
        message: format!("Unknown file type {value:?}"),
    })
}

fn scenario_file_from_row(row: &Row<'_>) -> duckdb::Result<(ScenarioFileRaw, String, String)> {
    Ok((
        ScenarioFileRaw {
            id: row.get(0)?,
            project_id: row.get(1)?,
            scenario_id: row.get(2)?,
            name: row.get(3)?,
            file_type: row.get(4)?,
            subtype: row.get(5)?,
            path: row.get(6)?,
        },
        row.get(7)?,
        row.get(8)?,
    ))
}

/// Columns read straight off the row before type/timestamp conversion.
struct ScenarioFileRaw {
    id: i64,
    project_id: i64,
    scenario_id: i64,
    name: String,
    file_type: String,
    subtype: Option<String>,
    path: String,
}

fn into_scenario_file(
    (raw, created_at, updated_at): (ScenarioFileRaw, String, String),
) -> Result<ScenarioFile, DbError> {
    Ok(ScenarioFile {
        id: raw.id,
        project_id: raw.project_id,
        scenario_id: raw.scenario_id,
        name: raw.name,
        file_type: parse_file_type(&raw.file_type)?,
        subtype: raw.subtype,
        path: raw.path,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

/// Lists the scenario's files of the given type, oldest first.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails or a row cannot be converted.
pub fn list_scenario_files(
    conn: &Connection,
    project_id: i64,
    scenario_id: i64,
    file_type: FileType,
) -> Result<Vec<ScenarioFile>, DbError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SCENARIO_FILE_COLUMNS}
         FROM scenarios_files
         WHERE project_id = ? AND scenario_id = ? AND file_type = ?
         ORDER BY id"
    ))?;

    let raw = stmt
        .query_map(
            params![project_id, scenario_id, file_type.as_ref()],
            scenario_file_from_row,
        )?
        .collect::<Result<Vec<_>, _>>()?;

    raw.into_iter().map(into_scenario_file).collect()
}

/// Returns the scenario's first file of the given type, if any.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails or the row cannot be converted.
pub fn get_scenario_file(
    conn: &Connection,
    project_id: i64,
    scenario_id: i64,
    file_type: FileType,
) -> Result<Option<ScenarioFile>, DbError> {
    Ok(list_scenario_files(conn, project_id, scenario_id, file_type)?
        .into_iter()
        .next())
}

/// Deletes every file row of the given type for the scenario.
///
/// Returns the deleted rows so the caller can clean up the blobs they
/// referenced.
///
/// # Errors
///
/// Returns [`DbError`] if the transaction fails.
pub fn delete_scenario_files(
    conn: &mut Connection,
    project_id: i64,
    scenario_id: i64,
    file_type: FileType,
) -> Result<Vec<ScenarioFile>, DbError> {
    let tx = conn.transaction()?;

    let deleted = list_scenario_files(&tx, project_id, scenario_id, file_type)?;
    if !deleted.is_empty() {
        tx.execute(
            "DELETE FROM scenarios_files
             WHERE project_id = ? AND scenario_id = ? AND file_type = ?",
            params![project_id, scenario_id, file_type.as_ref()],
        )?;
    }

    tx.commit()?;

    Ok(deleted)
}

/// Inserts a scenario file row and returns its id.
///
/// # Errors
///
/// Returns [`DbError`] if the insert fails.
pub fn insert_scenario_file(conn: &Connection, file: &NewScenarioFile) -> Result<i64, DbError> {
    let id = conn.query_row(
        "INSERT INTO scenarios_files (
            project_id, scenario_id, name, file_type, subtype, path, created_at, updated_at
         ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
         RETURNING id",
        params![
            file.project_id,
            file.scenario_id,
            file.name,
            file.file_type.as_ref(),
            file.subtype.as_deref(),
            file.path,
            format_timestamp(&file.created_at),
            format_timestamp(&file.updated_at),
        ],
        |row| row.get(0),
    )?;

    Ok(id)
}

/// Returns the distinct POI types uploaded for the scenario, in upload
/// order.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn list_poi_types(
    conn: &Connection,
    project_id: i64,
    scenario_id: i64,
) -> Result<Vec<String>, DbError> {
    let mut stmt = conn.prepare(
        "SELECT subtype
         FROM scenarios_files
         WHERE project_id = ? AND scenario_id = ? AND file_type = ? AND subtype IS NOT NULL
         GROUP BY subtype
         ORDER BY MIN(id)",
    )?;

    let types = stmt
        .query_map(
            params![project_id, scenario_id, FileType::Poi.as_ref()],
            |row| row.get(0),
        )?
        .collect::<Result<Vec<String>, _>>()?;

    Ok(types)
}

/// Returns the project's first file of the given type, if any.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails or the row cannot be converted.
pub fn get_project_file(
    conn: &Connection,
    project_id: i64,
    file_type: FileType,
) -> Result<Option<ProjectFile>, DbError> {
    let mut stmt = conn.prepare(
        "SELECT id, project_id, name, file_type, path
         FROM projects_files
         WHERE project_id = ? AND file_type = ?
         ORDER BY id
         LIMIT 1",
    )?;

    let mut rows = stmt.query(params![project_id, file_type.as_ref()])?;
    let Some(row) = rows.next()? else {
        return Ok(None);
    };

    let raw_type: String = row.get(3)?;

    Ok(Some(ProjectFile {
        id: row.get(0)?,
        project_id: row.get(1)?,
        name: row.get(2)?,
        file_type: parse_file_type(&raw_type)?,
        path: row.get(4)?,
    }))
}
