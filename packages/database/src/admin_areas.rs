//! Project administrative areas.

use duckdb::{Connection, params_from_iter};
use ram_database_models::AdminArea;

use crate::DbError;

/// Returns the admin areas of `project_id` whose ids are in `ids`, ordered
/// by id.
///
/// Ids that do not exist (or belong to another project) are silently
/// skipped.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn get_admin_areas(
    conn: &Connection,
    project_id: i64,
    ids: &[i64],
) -> Result<Vec<AdminArea>, DbError> {
    let mut areas = Vec::new();

    for chunk in ids.chunks(1000) {
        let placeholders: String = chunk.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
        let sql = format!(
            "SELECT id, name FROM projects_aa
             WHERE project_id = ? AND id IN ({placeholders})
             ORDER BY id"
        );
        let mut stmt = conn.prepare(&sql)?;

        let rows = stmt
            .query_map(
                params_from_iter(std::iter::once(&project_id).chain(chunk.iter())),
                |row| {
                    Ok(AdminArea {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )?
            .collect::<Result<Vec<_>, _>>()?;

        areas.extend(rows);
    }

    areas.sort_by_key(|a| a.id);

    Ok(areas)
}
