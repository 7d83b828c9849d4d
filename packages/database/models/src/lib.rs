#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Database row types and query parameter definitions.
//!
//! These types represent the shapes of data as stored in and retrieved from
//! the scenario store. They are distinct from the analysis response types
//! in `ram_analysis_models`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// A geographic bounding box in WGS84 coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Western longitude boundary.
    pub west: f64,
    /// Southern latitude boundary.
    pub south: f64,
    /// Eastern longitude boundary.
    pub east: f64,
    /// Northern latitude boundary.
    pub north: f64,
}

impl BoundingBox {
    /// Creates a new bounding box from the given coordinates.
    #[must_use]
    pub const fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// Returns the box as `[south, west, north, east]`, the order used by
    /// Overpass QL bbox filters.
    #[must_use]
    pub const fn to_swne(&self) -> [f64; 4] {
        [self.south, self.west, self.north, self.east]
    }
}

impl std::fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "(S,W,N,E) {},{},{},{}",
            self.south, self.west, self.north, self.east
        )
    }
}

/// Kind of file attached to a project or scenario.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum FileType {
    /// Raw road network (OSM XML).
    RoadNetwork,
    /// Points of interest, one file per POI subtype.
    Poi,
    /// Administrative boundaries `GeoJSON` for the project.
    AdminBounds,
    /// Per-origin results exported as CSV.
    ResultsCsv,
    /// Per-origin results exported as `GeoJSON`.
    ResultsGeojson,
}

/// Export format of a scenario's result files.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ResultsFormat {
    /// `csv`
    Csv,
    /// `geojson`
    Geojson,
}

impl ResultsFormat {
    /// File type of the scenario files holding results in this format.
    #[must_use]
    pub const fn file_type(self) -> FileType {
        match self {
            Self::Csv => FileType::ResultsCsv,
            Self::Geojson => FileType::ResultsGeojson,
        }
    }
}

/// A row of the `scenarios_files` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioFile {
    /// Primary key.
    pub id: i64,
    /// Owning project.
    pub project_id: i64,
    /// Owning scenario.
    pub scenario_id: i64,
    /// File name (no directory).
    pub name: String,
    /// What the file contains.
    pub file_type: FileType,
    /// POI type for `poi` files.
    pub subtype: Option<String>,
    /// Blob storage path.
    pub path: String,
    /// When the row was created.
    pub created_at: DateTime<Utc>,
    /// When the row was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Values for inserting a new `scenarios_files` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewScenarioFile {
    /// Owning project.
    pub project_id: i64,
    /// Owning scenario.
    pub scenario_id: i64,
    /// File name (no directory).
    pub name: String,
    /// What the file contains.
    pub file_type: FileType,
    /// POI type for `poi` files.
    pub subtype: Option<String>,
    /// Blob storage path.
    pub path: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// A row of the `projects_files` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectFile {
    /// Primary key.
    pub id: i64,
    /// Owning project.
    pub project_id: i64,
    /// File name.
    pub name: String,
    /// What the file contains.
    pub file_type: FileType,
    /// Blob storage path.
    pub path: String,
}

/// A row of the `scenarios_source_data` table describing where a scenario
/// input comes from.
///
/// `source_type` is kept as the raw persisted string; interpretation into a
/// typed source happens where the source is resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceDataRow {
    /// Primary key.
    pub id: i64,
    /// Owning project.
    pub project_id: i64,
    /// Owning scenario.
    pub scenario_id: i64,
    /// Which input this describes (e.g. `road-network`, `poi`).
    pub name: String,
    /// Source type (`file`, `osm`, `wbcatalog`).
    pub source_type: String,
    /// Source-specific parameters as a JSON document.
    pub data: Option<String>,
}

/// Keys of the `scenarios_settings` table used by the core.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SettingKey {
    /// JSON list of admin area ids selected for the scenario.
    AdminAreas,
    /// Whether the road network is small enough to be edited in place.
    RnActiveEditing,
}

/// An administrative area of a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminArea {
    /// Primary key.
    pub id: i64,
    /// Display name.
    pub name: String,
}

/// One raw travel-time result joined with its origin's population.
///
/// This is the row shape consumed by the accessibility aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopulationResultRow {
    /// Origin the travel time was computed from.
    pub origin_id: i64,
    /// Admin area the origin belongs to.
    pub admin_area_id: i64,
    /// POI type the travel time leads to.
    pub poi_type: String,
    /// Travel time in seconds; `None` when the POI is unreachable.
    pub time_to_poi: Option<i64>,
    /// Population of the origin; `None` when the stored value is null.
    pub pop_value: Option<f64>,
}

/// A raw result row as exposed by the paged results query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawResultRow {
    /// Origin id.
    pub origin_id: i64,
    /// Origin name.
    pub origin_name: String,
    /// Admin area id.
    pub admin_area_id: i64,
    /// Admin area name.
    pub admin_area_name: String,
    /// Population indicator value.
    pub pop_value: Option<f64>,
    /// Population indicator key (always `population`).
    pub pop_key: String,
    /// POI type.
    pub poi_type: String,
    /// Travel time in seconds.
    pub time_to_poi: Option<i64>,
}

/// Columns the paged results query can be sorted by.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RawResultsSort {
    /// `origin_id`
    OriginId,
    /// `origin_name`
    #[default]
    OriginName,
    /// `aa_id`
    #[strum(serialize = "aa_id")]
    #[serde(rename = "aa_id")]
    AdminAreaId,
    /// `aa_name`
    #[strum(serialize = "aa_name")]
    #[serde(rename = "aa_name")]
    AdminAreaName,
    /// `pop_value`
    PopValue,
    /// `poi_type`
    PoiType,
    /// `time_to_poi`
    TimeToPoi,
}

/// Sort direction for the paged results query.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SortDirection {
    /// Ascending.
    #[default]
    Asc,
    /// Descending.
    Desc,
}

/// Parameters for the paged raw results query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawResultsQuery {
    /// Column to sort by.
    pub sort_by: RawResultsSort,
    /// Sort direction.
    pub sort_dir: SortDirection,
    /// 1-based page number.
    pub page: u32,
    /// Rows per page.
    pub limit: u32,
}

impl Default for RawResultsQuery {
    fn default() -> Self {
        Self {
            sort_by: RawResultsSort::default(),
            sort_dir: SortDirection::default(),
            page: 1,
            limit: 50,
        }
    }
}

impl RawResultsQuery {
    /// Number of rows to skip for the requested page.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        (self.page.saturating_sub(1) as u64) * self.limit as u64
    }
}

/// Status of a long-running operation.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OperationStatus {
    /// Still running.
    Running,
    /// Finished successfully.
    Complete,
    /// Finished with an error.
    Failed,
}

/// A row of the `operations` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    /// Primary key.
    pub id: i64,
    /// Operation name (e.g. `project-setup-finish`).
    pub name: String,
    /// Owning project.
    pub project_id: i64,
    /// Owning scenario.
    pub scenario_id: i64,
    /// Current status.
    pub status: OperationStatus,
}

/// A row of the `operations_logs` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationLog {
    /// Primary key.
    pub id: i64,
    /// Owning operation.
    pub operation_id: i64,
    /// Log code (e.g. `process:road-network`).
    pub code: String,
    /// JSON payload.
    pub data: Option<String>,
}
