#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Accessibility analysis over a scenario's raw travel-time results.
//!
//! [`accessibility::compute`] turns the (origin, POI type, travel time)
//! rows into population-weighted reachability curves per POI type and
//! admin area. [`raw_results::raw_results`] pages through the same rows
//! for inspection, and [`archive::results_archive`] bundles the exported
//! result files for download.

pub mod accessibility;
pub mod archive;
pub mod normalize;
pub mod raw_results;

use ram_database::DbError;
use ram_storage::StorageError;

pub use accessibility::{build_curves, compute};
pub use archive::results_archive;
pub use normalize::deburr;
pub use raw_results::raw_results;

/// Errors that can occur during analysis.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// Scenario settings needed by the analysis are missing or malformed.
    #[error("Invalid configuration: {message}")]
    Config {
        /// Description of the problem.
        message: String,
    },

    /// The requested results do not exist.
    #[error("Not found: {message}")]
    NotFound {
        /// What was missing.
        message: String,
    },

    /// Database error.
    #[error(transparent)]
    Db(#[from] DbError),

    /// Blob storage error.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Writing the results archive failed.
    #[error("Failed to build results archive: {0}")]
    Archive(#[from] zip::result::ZipError),
}
