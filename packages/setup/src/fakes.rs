//! Recording fakes of the setup collaborators and a harness wiring them to
//! an in-memory database and a temporary blob store.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use geojson::FeatureCollection;
use ram_catalog::{CatalogClient, CatalogError, CatalogParams};
use ram_database::Db;
use ram_database::operations::{create_operation, get_operation_logs};
use ram_database::scenario_files::{insert_scenario_file, list_scenario_files};
use ram_database::source_data::insert_source_data;
use ram_database_models::{BoundingBox, FileType, NewScenarioFile, OperationLog, ScenarioFile};
use ram_overpass::{MapDataClient, OverpassError};
use ram_storage::{BlobStore, LocalBlobStore};
use tempfile::TempDir;

use crate::collaborators::{ImportError, StructuredImport, VectorTileBuilder};
use crate::context::{SetupContext, SetupServices};

pub const PROJECT_ID: i64 = 1;
pub const SCENARIO_ID: i64 = 10;

pub const ADMIN_BOUNDS_JSON: &str = r#"{
    "type": "FeatureCollection",
    "features": [
        {
            "type": "Feature",
            "properties": {"name": "Boquim"},
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[-37.6, -11.2], [-37.5, -11.2], [-37.5, -11.1], [-37.6, -11.2]]]
            }
        },
        {
            "type": "Feature",
            "properties": {"name": "Estância"},
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[-37.4, -11.3], [-37.2, -11.3], [-37.2, -10.9], [-37.4, -11.3]]]
            }
        }
    ]
}"#;

pub fn admin_bounds_fc() -> FeatureCollection {
    serde_json::from_str(ADMIN_BOUNDS_JSON).unwrap()
}

#[derive(Default)]
pub struct FakeMapData {
    calls: Mutex<Vec<BoundingBox>>,
    fail: AtomicBool,
}

impl FakeMapData {
    pub fn calls(&self) -> Vec<BoundingBox> {
        self.calls.lock().unwrap().clone()
    }

    pub fn fail_next(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    pub fn body(&self) -> Vec<u8> {
        b"<osm version=\"0.6\"><way id=\"1\"/></osm>".to_vec()
    }
}

#[async_trait::async_trait]
impl MapDataClient for FakeMapData {
    async fn fetch_road_network(&self, bbox: &BoundingBox) -> Result<Vec<u8>, OverpassError> {
        self.calls.lock().unwrap().push(*bbox);
        if self.fail.swap(false, Ordering::SeqCst) {
            return Err(OverpassError::Aborted {
                message: "runtime error: out of memory".to_string(),
            });
        }
        Ok(self.body())
    }
}

#[derive(Default)]
pub struct FakeCatalog {
    calls: AtomicUsize,
    last: Mutex<Option<CatalogParams>>,
    fail: AtomicBool,
}

impl FakeCatalog {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_params(&self) -> Option<CatalogParams> {
        self.last.lock().unwrap().clone()
    }

    pub fn fail_next(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl CatalogClient for FakeCatalog {
    async fn download(&self, params: &CatalogParams) -> Result<Vec<u8>, CatalogError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last.lock().unwrap() = Some(params.clone());
        if self.fail.swap(false, Ordering::SeqCst) {
            return Err(CatalogError::Resource {
                resource_id: params.resource_id.clone(),
                message: "resource has no url".to_string(),
            });
        }
        Ok(b"<osm version=\"0.6\"/>".to_vec())
    }
}

#[derive(Default)]
pub struct FakeImport {
    imported: Mutex<Vec<Vec<u8>>>,
    removed: AtomicUsize,
    fail: AtomicBool,
}

impl FakeImport {
    pub fn imported(&self) -> Vec<Vec<u8>> {
        self.imported.lock().unwrap().clone()
    }

    pub fn removed(&self) -> usize {
        self.removed.load(Ordering::SeqCst)
    }

    pub fn fail_imports(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl StructuredImport for FakeImport {
    async fn import_road_network(
        &self,
        _project_id: i64,
        _scenario_id: i64,
        bytes: Vec<u8>,
    ) -> Result<(), ImportError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ImportError::Failed {
                program: "fake-import".to_string(),
                status: "exit status: 1".to_string(),
                stderr: "corrupt input".to_string(),
            });
        }
        self.imported.lock().unwrap().push(bytes);
        Ok(())
    }

    async fn remove_database(&self, _project_id: i64, _scenario_id: i64) -> Result<(), ImportError> {
        self.removed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeTiles {
    built: Mutex<Vec<(i64, i64, String)>>,
}

impl FakeTiles {
    pub fn built(&self) -> Vec<(i64, i64, String)> {
        self.built.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl VectorTileBuilder for FakeTiles {
    async fn build(
        &self,
        project_id: i64,
        scenario_id: i64,
        source_path: &str,
    ) -> Result<(), ImportError> {
        self.built
            .lock()
            .unwrap()
            .push((project_id, scenario_id, source_path.to_string()));
        Ok(())
    }
}

pub struct Harness {
    pub ctx: SetupContext,
    pub storage: Arc<dyn BlobStore>,
    pub map_data: Arc<FakeMapData>,
    pub catalog: Arc<FakeCatalog>,
    pub import: Arc<FakeImport>,
    pub tiles: Arc<FakeTiles>,
    _dir: TempDir,
}

impl Harness {
    pub async fn new() -> Self {
        Self::build(1024 * 1024, false).await
    }

    pub async fn with_edit_max(road_net_edit_max: u64) -> Self {
        Self::build(road_net_edit_max, false).await
    }

    pub async fn with_vector_tiles() -> Self {
        Self::build(1024 * 1024, true).await
    }

    async fn build(road_net_edit_max: u64, vector_tiles: bool) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let db = Db::open_in_memory().unwrap();
        let storage: Arc<dyn BlobStore> = Arc::new(LocalBlobStore::new(dir.path()));
        let map_data = Arc::new(FakeMapData::default());
        let catalog = Arc::new(FakeCatalog::default());
        let import = Arc::new(FakeImport::default());
        let tiles = Arc::new(FakeTiles::default());

        let services = SetupServices {
            db: db.clone(),
            storage: Arc::clone(&storage),
            map_data: Arc::clone(&map_data) as Arc<dyn MapDataClient>,
            catalog: Arc::clone(&catalog) as Arc<dyn CatalogClient>,
            import: Arc::clone(&import) as Arc<dyn StructuredImport>,
            vector_tiles: vector_tiles
                .then(|| Arc::clone(&tiles) as Arc<dyn VectorTileBuilder>),
            road_net_edit_max,
        };

        let operation_id = db
            .run(|conn| create_operation(conn, "project-setup", PROJECT_ID, SCENARIO_ID))
            .await
            .unwrap();

        Self {
            ctx: SetupContext::new(services, PROJECT_ID, SCENARIO_ID, operation_id),
            storage,
            map_data,
            catalog,
            import,
            tiles,
            _dir: dir,
        }
    }

    /// Context for another run of the same scenario, with fresh events.
    pub fn fresh_run(&self) -> SetupContext {
        SetupContext::new(
            self.ctx.services.clone(),
            PROJECT_ID,
            SCENARIO_ID,
            self.ctx.op.operation_id(),
        )
    }

    pub async fn set_source(&self, source_type: &str, data: Option<&str>) {
        let source_type = source_type.to_string();
        let data = data.map(str::to_string);
        self.ctx
            .services
            .db
            .run(move |conn| {
                insert_source_data(
                    conn,
                    PROJECT_ID,
                    SCENARIO_ID,
                    "road-network",
                    &source_type,
                    data.as_deref(),
                )
            })
            .await
            .unwrap();
    }

    pub async fn upload_road_network(&self, bytes: &[u8]) {
        let path = format!("scenario-{SCENARIO_ID}/road-network_upload");
        self.storage.put(&path, bytes.to_vec()).await.unwrap();

        let now = Utc::now();
        let row = NewScenarioFile {
            project_id: PROJECT_ID,
            scenario_id: SCENARIO_ID,
            name: "road-network_upload".to_string(),
            file_type: FileType::RoadNetwork,
            subtype: None,
            path,
            created_at: now,
            updated_at: now,
        };
        self.ctx
            .services
            .db
            .run(move |conn| insert_scenario_file(conn, &row))
            .await
            .unwrap();
    }

    pub async fn upload_admin_bounds(&self, json: &str) {
        let path = format!("project-{PROJECT_ID}/admin-bounds");
        self.storage
            .put(&path, json.as_bytes().to_vec())
            .await
            .unwrap();
        self.ctx
            .services
            .db
            .run(move |conn| {
                conn.execute_batch(&format!(
                    "INSERT INTO projects_files (project_id, name, file_type, path)
                     VALUES ({PROJECT_ID}, 'admin-bounds', 'admin-bounds', '{path}');"
                ))?;
                Ok(())
            })
            .await
            .unwrap();
    }

    pub async fn road_network_rows(&self) -> Vec<ScenarioFile> {
        self.ctx
            .services
            .db
            .run(|conn| list_scenario_files(conn, PROJECT_ID, SCENARIO_ID, FileType::RoadNetwork))
            .await
            .unwrap()
    }

    pub async fn operation_logs(&self) -> Vec<OperationLog> {
        let operation_id = self.ctx.op.operation_id();
        self.ctx
            .services
            .db
            .run(move |conn| get_operation_logs(conn, operation_id))
            .await
            .unwrap()
    }
}
