//! Builds the store, clients and collaborators from configuration.

use std::sync::Arc;

use ram_catalog::CkanClient;
use ram_config::{Config, StorageConfig, StorageEngine};
use ram_database::{Db, DbError};
use ram_overpass::OverpassClient;
use ram_setup::SetupServices;
use ram_setup::commands::{CommandImport, CommandVectorTiles};
use ram_storage::{BlobStore, LocalBlobStore, S3BlobStore, S3Settings};

/// Opens the configured scenario store.
///
/// # Errors
///
/// Returns [`DbError`] if the database cannot be opened.
pub fn open_db(config: &Config) -> Result<Db, DbError> {
    Db::open(&config.database_path)
}

/// Creates the configured blob store.
#[must_use]
pub fn blob_store(storage: &StorageConfig) -> Arc<dyn BlobStore> {
    match storage.engine {
        StorageEngine::S3 => {
            log::debug!("Using S3 bucket {}", storage.bucket);
            Arc::new(S3BlobStore::new(&S3Settings {
                bucket: storage.bucket.clone(),
                endpoint: storage.endpoint.clone(),
                region: storage.region.clone(),
                access_key: storage.access_key.clone(),
                secret_key: storage.secret_key.clone(),
            }))
        }
        StorageEngine::Local => {
            log::debug!("Using local storage in {}", storage.local_dir.display());
            Arc::new(LocalBlobStore::new(storage.local_dir.clone()))
        }
    }
}

/// Wires everything a setup run needs.
#[must_use]
pub fn setup_services(config: &Config, db: Db) -> SetupServices {
    let commands = &config.commands;

    let vector_tiles = if config.vector_tiles_enabled() {
        commands.vector_tiles.clone().map(|argv| {
            Arc::new(CommandVectorTiles::new(argv)) as Arc<dyn ram_setup::VectorTileBuilder>
        })
    } else {
        None
    };

    SetupServices {
        db,
        storage: blob_store(&config.storage),
        map_data: Arc::new(OverpassClient::new(config.overpass_url.clone())),
        catalog: Arc::new(CkanClient::new(config.catalog_url.clone())),
        import: Arc::new(CommandImport::new(
            commands.import_road_network.clone(),
            commands.remove_database.clone(),
        )),
        vector_tiles,
        road_net_edit_max: config.road_net_edit_max,
    }
}
