//! External collaborators the setup pipeline drives but does not own.

/// Errors reported by the structured-import and vector-tile collaborators.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    /// The collaborator could not be started or fed its input.
    #[error("Failed to run {program}: {source}")]
    Spawn {
        /// Program that was started.
        program: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The collaborator ran and reported failure.
    #[error("{program} failed ({status}): {stderr}")]
    Failed {
        /// Program that failed.
        program: String,
        /// Exit status description.
        status: String,
        /// Tail of its standard error.
        stderr: String,
    },
}

/// Loads a raw road network into the scenario's editable network database.
#[async_trait::async_trait]
pub trait StructuredImport: Send + Sync {
    /// Imports the raw OSM bytes of a road network.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError`] if the import fails.
    async fn import_road_network(
        &self,
        project_id: i64,
        scenario_id: i64,
        bytes: Vec<u8>,
    ) -> Result<(), ImportError>;

    /// Removes the scenario's previous editable network database, if any.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError`] if the removal fails.
    async fn remove_database(&self, project_id: i64, scenario_id: i64) -> Result<(), ImportError>;
}

/// Renders the vector tiles used to display a road network.
#[async_trait::async_trait]
pub trait VectorTileBuilder: Send + Sync {
    /// Builds the tiles for the raw file stored at `source_path`.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError`] if tile generation fails.
    async fn build(
        &self,
        project_id: i64,
        scenario_id: i64,
        source_path: &str,
    ) -> Result<(), ImportError>;
}
