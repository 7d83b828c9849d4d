#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Accessibility analysis output types.

use ram_database_models::RawResultRow;
use serde::{Deserialize, Serialize};

/// Travel-time thresholds, in minutes, every curve is evaluated at.
pub const ANALYSIS_MINS: [u32; 6] = [10, 20, 30, 60, 90, 120];

/// Share of population reachable within each threshold, for one POI type
/// and one admin area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminAreaCurve {
    /// Admin area id.
    pub id: i64,
    /// Admin area display name.
    pub name: String,
    /// Percentage (0-100) per entry of [`ANALYSIS_MINS`]; empty when the
    /// area has no results for the POI type.
    pub data: Vec<f64>,
}

/// Accessibility of one POI type across the scenario's admin areas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessibilityCurve {
    /// POI type.
    pub poi: String,
    /// Thresholds the `data` series of each area refer to.
    pub analysis_mins: Vec<u32>,
    /// Admin areas, in display order.
    pub admin_areas: Vec<AdminAreaCurve>,
}

/// One page of raw results plus the total row count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawResultsPage {
    /// Rows matching the query, ignoring paging.
    pub count: u64,
    /// Rows of the requested page.
    pub results: Vec<RawResultRow>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curve_serializes_camel_case() {
        let curve = AccessibilityCurve {
            poi: "school".to_string(),
            analysis_mins: ANALYSIS_MINS.to_vec(),
            admin_areas: vec![AdminAreaCurve {
                id: 1,
                name: "Boquim".to_string(),
                data: vec![],
            }],
        };

        let json = serde_json::to_value(&curve).unwrap();
        assert_eq!(json["analysisMins"][5], 120);
        assert_eq!(json["adminAreas"][0]["name"], "Boquim");
        assert!(json["adminAreas"][0]["data"].as_array().unwrap().is_empty());
    }
}
