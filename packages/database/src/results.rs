//! Raw travel-time results joined with origin population.
//!
//! Both read paths share [`RESULTS_JOIN`] so the paged rows and the total
//! count always describe the same row set.

use duckdb::{Connection, params, params_from_iter};
use ram_database_models::{
    PopulationResultRow, RawResultRow, RawResultsQuery, RawResultsSort, SortDirection,
};

use crate::DbError;

/// Join and filter shared by every results query. Binds
/// `(project_id, scenario_id)`.
///
/// Origins without a `population` indicator row are dropped by the inner
/// join.
const RESULTS_JOIN: &str = "
    FROM results r
    INNER JOIN results_poi rp ON rp.result_id = r.id
    INNER JOIN projects_origins po ON po.id = r.origin_id
    INNER JOIN projects_origins_indicators ind
        ON ind.origin_id = r.origin_id AND ind.key = 'population'
    INNER JOIN projects_aa aa ON aa.id = r.project_aa_id
    WHERE r.project_id = ? AND r.scenario_id = ?";

/// Maps a whitelisted sort column to its SQL expression.
const fn sort_column(sort: RawResultsSort) -> &'static str {
    match sort {
        RawResultsSort::OriginId => "po.id",
        RawResultsSort::OriginName => "po.name",
        RawResultsSort::AdminAreaId => "aa.id",
        RawResultsSort::AdminAreaName => "aa.name",
        RawResultsSort::PopValue => "ind.value",
        RawResultsSort::PoiType => "rp.poi_type",
        RawResultsSort::TimeToPoi => "rp.travel_time",
    }
}

const fn sort_direction(dir: SortDirection) -> &'static str {
    match dir {
        SortDirection::Asc => "ASC",
        SortDirection::Desc => "DESC",
    }
}

/// Loads every raw result of the scenario for the given POI types and
/// admin areas, each joined with its origin's population value.
///
/// This is the single bulk read behind the accessibility aggregation; it is
/// not paginated.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn get_population_results(
    conn: &Connection,
    project_id: i64,
    scenario_id: i64,
    poi_types: &[String],
    admin_area_ids: &[i64],
) -> Result<Vec<PopulationResultRow>, DbError> {
    if poi_types.is_empty() || admin_area_ids.is_empty() {
        return Ok(Vec::new());
    }

    let poi_placeholders = vec!["?"; poi_types.len()].join(", ");
    let aa_placeholders = vec!["?"; admin_area_ids.len()].join(", ");

    let sql = format!(
        "SELECT r.origin_id, r.project_aa_id, rp.poi_type, rp.travel_time, ind.value
         {RESULTS_JOIN}
           AND rp.poi_type IN ({poi_placeholders})
           AND r.project_aa_id IN ({aa_placeholders})
         ORDER BY r.id, rp.poi_type"
    );

    let mut bind: Vec<Box<dyn duckdb::ToSql>> =
        Vec::with_capacity(2 + poi_types.len() + admin_area_ids.len());
    bind.push(Box::new(project_id));
    bind.push(Box::new(scenario_id));
    for poi in poi_types {
        bind.push(Box::new(poi.clone()));
    }
    for id in admin_area_ids {
        bind.push(Box::new(*id));
    }

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(bind.iter()), |row| {
            Ok(PopulationResultRow {
                origin_id: row.get(0)?,
                admin_area_id: row.get(1)?,
                poi_type: row.get(2)?,
                time_to_poi: row.get(3)?,
                pop_value: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    log::debug!(
        "p{project_id} s{scenario_id} loaded {} population results",
        rows.len()
    );

    Ok(rows)
}

/// Counts the rows [`get_raw_results`] pages over.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn count_raw_results(
    conn: &Connection,
    project_id: i64,
    scenario_id: i64,
) -> Result<u64, DbError> {
    let count: i64 = conn.query_row(
        &format!("SELECT COUNT(*) {RESULTS_JOIN}"),
        params![project_id, scenario_id],
        |row| row.get(0),
    )?;

    u64::try_from(count).map_err(|e| DbError::Conversion {
        message: format!("Negative result count {count}: {e}"),
    })
}

/// Returns one page of raw results sorted by a whitelisted column.
///
/// Ties are broken by result id and POI type so pages never overlap.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn get_raw_results(
    conn: &Connection,
    project_id: i64,
    scenario_id: i64,
    query: &RawResultsQuery,
) -> Result<Vec<RawResultRow>, DbError> {
    let sql = format!(
        "SELECT po.id, po.name, aa.id, aa.name, ind.value, ind.key, rp.poi_type, rp.travel_time
         {RESULTS_JOIN}
         ORDER BY {column} {dir}, r.id, rp.poi_type
         LIMIT {limit} OFFSET {offset}",
        column = sort_column(query.sort_by),
        dir = sort_direction(query.sort_dir),
        limit = query.limit,
        offset = query.offset(),
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![project_id, scenario_id], |row| {
            Ok(RawResultRow {
                origin_id: row.get(0)?,
                origin_name: row.get(1)?,
                admin_area_id: row.get(2)?,
                admin_area_name: row.get(3)?,
                pop_value: row.get(4)?,
                pop_key: row.get(5)?,
                poi_type: row.get(6)?,
                time_to_poi: row.get(7)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(rows)
}
