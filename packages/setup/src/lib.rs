#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Per-scenario setup pipeline.
//!
//! A scenario setup run obtains the scenario's road network from one of
//! several sources, stores the raw file, decides whether the network is
//! small enough for interactive editing and, if so, hands it to the
//! structured-import collaborator. An independent admin-bounds step runs
//! alongside it; the two talk only through the run's
//! [`EventCoordinator`].
//!
//! * [`source`] decides where the road network comes from.
//! * [`road_network`] fetches, persists and imports it.
//! * [`admin_bounds`] publishes the project's admin boundaries.
//! * [`pipeline`] runs both steps under a deadline.

pub mod admin_bounds;
pub mod collaborators;
pub mod commands;
pub mod context;
pub mod events;
pub mod operation;
pub mod pipeline;
pub mod road_network;
pub mod source;

#[cfg(test)]
mod fakes;

use std::time::Duration;

use ram_catalog::CatalogError;
use ram_database::DbError;
use ram_overpass::OverpassError;
use ram_storage::StorageError;

pub use collaborators::{ImportError, StructuredImport, VectorTileBuilder};
pub use context::{SetupContext, SetupServices};
pub use events::{EventCoordinator, EventName, SetupEvent};
pub use pipeline::run_setup;
pub use road_network::RoadNetworkOutcome;
pub use source::RoadNetworkSource;

/// Errors that can occur during a setup run.
///
/// `NotFound`, `Config`, `Import` and the two upstream variants
/// (`MapData`, `Catalog`) abort the run. `Timeout` is reported by the
/// pipeline driver and is safe to retry.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    /// A row or file the run depends on does not exist.
    #[error("Not found: {what}")]
    NotFound {
        /// What was missing.
        what: String,
    },

    /// Persisted configuration is unknown or malformed.
    #[error("Invalid configuration: {message}")]
    Config {
        /// Description of the problem.
        message: String,
    },

    /// The map-data service failed.
    #[error("Map data fetch failed: {0}")]
    MapData(#[from] OverpassError),

    /// The data catalog failed.
    #[error("Catalog download failed: {0}")]
    Catalog(#[from] CatalogError),

    /// The structured-import collaborator failed.
    #[error("Structured import failed: {0}")]
    Import(#[from] ImportError),

    /// The project's admin boundaries could not be read.
    #[error("Invalid admin bounds: {message}")]
    InvalidAdminBounds {
        /// Description of the problem.
        message: String,
    },

    /// An event was published twice in the same run.
    #[error("Event {name} was already emitted")]
    EventAlreadyEmitted {
        /// The event.
        name: EventName,
    },

    /// The run did not finish before its deadline.
    #[error("Setup of project {project_id} scenario {scenario_id} timed out after {timeout:?}")]
    Timeout {
        /// Project being set up.
        project_id: i64,
        /// Scenario being set up.
        scenario_id: i64,
        /// Deadline that expired.
        timeout: Duration,
    },

    /// Blob storage error.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Database error.
    #[error(transparent)]
    Db(#[from] DbError),
}

impl SetupError {
    /// Whether the error came from an external service rather than from
    /// this system's own data.
    #[must_use]
    pub const fn is_upstream(&self) -> bool {
        matches!(self, Self::MapData(_) | Self::Catalog(_))
    }
}
