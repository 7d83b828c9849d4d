//! Handles shared by every step of a setup run.

use std::sync::Arc;

use ram_catalog::CatalogClient;
use ram_database::Db;
use ram_overpass::MapDataClient;
use ram_storage::BlobStore;

use crate::collaborators::{StructuredImport, VectorTileBuilder};
use crate::events::EventCoordinator;
use crate::operation::OperationLogger;

/// Long-lived services, shared across runs.
#[derive(Clone)]
pub struct SetupServices {
    pub db: Db,
    pub storage: Arc<dyn BlobStore>,
    pub map_data: Arc<dyn MapDataClient>,
    pub catalog: Arc<dyn CatalogClient>,
    pub import: Arc<dyn StructuredImport>,
    /// `None` disables vector tile generation.
    pub vector_tiles: Option<Arc<dyn VectorTileBuilder>>,
    /// Road networks at least this large (in bytes) are not imported for
    /// interactive editing.
    pub road_net_edit_max: u64,
}

impl std::fmt::Debug for SetupServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SetupServices")
            .field("db", &self.db)
            .field("vector_tiles", &self.vector_tiles.is_some())
            .field("road_net_edit_max", &self.road_net_edit_max)
            .finish_non_exhaustive()
    }
}

/// Everything one run of one scenario needs.
#[derive(Debug, Clone)]
pub struct SetupContext {
    pub project_id: i64,
    pub scenario_id: i64,
    pub services: SetupServices,
    pub events: Arc<EventCoordinator>,
    pub op: OperationLogger,
}

impl SetupContext {
    /// Creates a context with a fresh [`EventCoordinator`].
    #[must_use]
    pub fn new(
        services: SetupServices,
        project_id: i64,
        scenario_id: i64,
        operation_id: i64,
    ) -> Self {
        let op = OperationLogger::new(services.db.clone(), operation_id);
        Self {
            project_id,
            scenario_id,
            services,
            events: Arc::new(EventCoordinator::new()),
            op,
        }
    }
}
