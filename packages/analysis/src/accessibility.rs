//! Population-weighted accessibility curves.
//!
//! For every POI type and selected admin area, the curve gives the share of
//! the area's population whose travel time to the nearest POI of that type
//! is within each of [`ANALYSIS_MINS`]. Origins without a population
//! indicator are not part of the result rows at all; origins whose
//! population value is null count as one person.

use std::collections::HashMap;

use ram_analysis_models::{ANALYSIS_MINS, AccessibilityCurve, AdminAreaCurve};
use ram_database::Db;
use ram_database::admin_areas::get_admin_areas;
use ram_database::results::get_population_results;
use ram_database::scenario_files::list_poi_types;
use ram_database::settings::get_setting;
use ram_database_models::{AdminArea, PopulationResultRow, SettingKey};
use serde_json::Value;

use crate::AnalysisError;
use crate::normalize::deburr;

/// Computes the accessibility curves of a scenario.
///
/// # Errors
///
/// Returns [`AnalysisError::Config`] if the scenario's `admin_areas`
/// setting is missing or malformed, or [`AnalysisError::Db`] if a query
/// fails.
pub async fn compute(
    db: &Db,
    project_id: i64,
    scenario_id: i64,
) -> Result<Vec<AccessibilityCurve>, AnalysisError> {
    let (poi_types, selected) = db
        .run(move |conn| {
            Ok((
                list_poi_types(conn, project_id, scenario_id)?,
                get_setting(conn, scenario_id, SettingKey::AdminAreas)?,
            ))
        })
        .await?;

    let selected = selected.ok_or_else(|| AnalysisError::Config {
        message: format!("Scenario {scenario_id} has no {} setting", SettingKey::AdminAreas),
    })?;
    let ids = parse_admin_area_ids(&selected).map_err(|message| AnalysisError::Config {
        message: format!(
            "Scenario {scenario_id} {} setting is invalid: {message}",
            SettingKey::AdminAreas
        ),
    })?;

    let (admin_areas, rows) = {
        let poi_types = poi_types.clone();
        db.run(move |conn| {
            let admin_areas = get_admin_areas(conn, project_id, &ids)?;
            let area_ids: Vec<i64> = admin_areas.iter().map(|aa| aa.id).collect();
            let rows =
                get_population_results(conn, project_id, scenario_id, &poi_types, &area_ids)?;
            Ok((admin_areas, rows))
        })
        .await?
    };

    log::debug!(
        "p{project_id} s{scenario_id}: {} POI types, {} admin areas, {} result rows",
        poi_types.len(),
        admin_areas.len(),
        rows.len()
    );

    Ok(build_curves(&poi_types, &admin_areas, &rows))
}

/// Parses the `admin_areas` setting: a JSON array of ids, given as numbers
/// or numeric strings.
fn parse_admin_area_ids(value: &str) -> Result<Vec<i64>, String> {
    let values: Vec<Value> = serde_json::from_str(value).map_err(|e| e.to_string())?;

    values
        .iter()
        .map(|v| match v {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
        .ok_or_else(|| format!("{v} is not an admin area id")))
        .collect()
}

/// Weight of one result row. Missing or non-finite population counts as 1.
fn population(row: &PopulationResultRow) -> f64 {
    row.pop_value.filter(|v| v.is_finite()).unwrap_or(1.0)
}

fn reachable_within(row: &PopulationResultRow, minutes: u32) -> bool {
    row.time_to_poi
        .is_some_and(|seconds| seconds <= i64::from(minutes) * 60)
}

/// Reachability percentages for the rows of one POI type and admin area.
///
/// Empty when there are no rows. All zeros when the total population is
/// not positive.
fn curve_data(rows: &[&PopulationResultRow]) -> Vec<f64> {
    if rows.is_empty() {
        return vec![];
    }

    let total: f64 = rows.iter().copied().map(population).sum();
    if total <= 0.0 {
        return vec![0.0; ANALYSIS_MINS.len()];
    }

    ANALYSIS_MINS
        .iter()
        .map(|&minutes| {
            let reachable: f64 = rows
                .iter()
                .copied()
                .filter(|row| reachable_within(row, minutes))
                .map(population)
                .sum();
            reachable / total * 100.0
        })
        .collect()
}

/// Builds the curves for every POI type × admin area pair from the joined
/// result rows.
///
/// Admin areas are sorted by diacritic-folded name ascending and the list
/// is then reversed, so areas with equal folded names end up in reverse
/// input order.
#[must_use]
pub fn build_curves(
    poi_types: &[String],
    admin_areas: &[AdminArea],
    rows: &[PopulationResultRow],
) -> Vec<AccessibilityCurve> {
    let mut grouped: HashMap<(&str, i64), Vec<&PopulationResultRow>> = HashMap::new();
    for row in rows {
        grouped
            .entry((row.poi_type.as_str(), row.admin_area_id))
            .or_default()
            .push(row);
    }

    poi_types
        .iter()
        .map(|poi| {
            let mut areas: Vec<AdminAreaCurve> = admin_areas
                .iter()
                .map(|aa| AdminAreaCurve {
                    id: aa.id,
                    name: aa.name.clone(),
                    data: grouped
                        .get(&(poi.as_str(), aa.id))
                        .map_or_else(Vec::new, |rows| curve_data(rows)),
                })
                .collect();

            areas.sort_by_cached_key(|aa| deburr(&aa.name));
            areas.reverse();

            AccessibilityCurve {
                poi: poi.clone(),
                analysis_mins: ANALYSIS_MINS.to_vec(),
                admin_areas: areas,
            }
        })
        .collect()
}
