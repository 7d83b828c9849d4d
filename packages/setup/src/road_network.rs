//! Road network ingestion for one scenario.
//!
//! Whatever the source, the run ends the same way: the raw file is in blob
//! storage with exactly one `road-network` row pointing at it, the
//! `rn_active_editing` setting says whether the network is small enough to
//! edit, the structured import ran if it is, and
//! `road-network:active-editing` has been emitted.

use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use ram_database::scenario_files::{delete_scenario_files, get_scenario_file, insert_scenario_file};
use ram_database::settings::set_setting;
use ram_database_models::{FileType, NewScenarioFile, SettingKey};
use ram_overpass::{OverpassError, fc_bbox};
use tokio::task::JoinHandle;

use crate::context::SetupContext;
use crate::events::SetupEvent;
use crate::source::{RoadNetworkSource, resolve};
use crate::SetupError;

/// Operation log code for road network progress.
pub const LOG_CODE: &str = "process:road-network";

/// Result of a road network import.
#[derive(Debug)]
pub struct RoadNetworkOutcome {
    /// Blob path of the raw road network.
    pub path: String,
    /// Size of the raw file in bytes.
    pub size_bytes: u64,
    /// Whether the network was imported for interactive editing.
    pub active_editing: bool,
    /// Vector tile generation, if it was started. Nothing awaits it.
    pub vector_tiles: Option<JoinHandle<()>>,
}

/// Blob path for a freshly fetched road network.
fn blob_path(scenario_id: i64, name: &str) -> String {
    format!("scenario-{scenario_id}/{name}")
}

/// Imports the scenario's road network.
///
/// # Errors
///
/// Returns [`SetupError`] if the source cannot be resolved, the fetch,
/// blob storage or structured import fails, or the active-editing event
/// was already emitted in this run.
pub async fn import(ctx: &SetupContext) -> Result<RoadNetworkOutcome, SetupError> {
    let (project_id, scenario_id) = (ctx.project_id, ctx.scenario_id);
    let source = resolve(&ctx.services.db, project_id, scenario_id).await?;
    log::info!(
        "p{project_id} s{scenario_id}: road network source is {}",
        source.source_type()
    );

    let path = match source {
        RoadNetworkSource::File => uploaded_file_path(ctx).await?,
        RoadNetworkSource::Catalog(params) => {
            ctx.op
                .log(LOG_CODE, "Importing road network from catalog")
                .await?;
            let catalog = Arc::clone(&ctx.services.catalog);
            replace_raw_file(ctx, async move {
                catalog.download(&params).await.map_err(|e| {
                    log::error!(
                        "p{project_id} s{scenario_id}: catalog resource {} failed: {e}",
                        params.resource_id
                    );
                    SetupError::Catalog(e)
                })
            })
            .await?
        }
        RoadNetworkSource::Osm => {
            let fc = ctx.events.wait_for_admin_bounds().await;
            let bbox = fc_bbox(&fc).map_err(|e| match e {
                OverpassError::EmptyBounds => SetupError::InvalidAdminBounds {
                    message: e.to_string(),
                },
                other => SetupError::MapData(other),
            })?;

            ctx.op
                .log(LOG_CODE, "Importing road network from OSM")
                .await?;
            let map_data = Arc::clone(&ctx.services.map_data);
            replace_raw_file(ctx, async move {
                map_data.fetch_road_network(&bbox).await.map_err(|e| {
                    log::error!("p{project_id} s{scenario_id}: OSM fetch for {bbox} failed: {e}");
                    SetupError::MapData(e)
                })
            })
            .await?
        }
    };

    process_raw_file(ctx, path).await
}

async fn uploaded_file_path(ctx: &SetupContext) -> Result<String, SetupError> {
    let (project_id, scenario_id) = (ctx.project_id, ctx.scenario_id);
    let file = ctx
        .services
        .db
        .run(move |conn| get_scenario_file(conn, project_id, scenario_id, FileType::RoadNetwork))
        .await?
        .ok_or_else(|| SetupError::NotFound {
            what: format!("uploaded road network of project {project_id} scenario {scenario_id}"),
        })?;
    Ok(file.path)
}

/// Replaces the scenario's road network row with freshly fetched bytes.
///
/// Existing rows and their blobs are removed before `fetch` runs, so a
/// failed fetch leaves neither a row nor an unreferenced blob behind.
async fn replace_raw_file<F>(ctx: &SetupContext, fetch: F) -> Result<String, SetupError>
where
    F: Future<Output = Result<Vec<u8>, SetupError>> + Send,
{
    let (project_id, scenario_id) = (ctx.project_id, ctx.scenario_id);
    let db = &ctx.services.db;

    let superseded = db
        .run(move |conn| {
            delete_scenario_files(conn, project_id, scenario_id, FileType::RoadNetwork)
        })
        .await?;

    for old in &superseded {
        if let Err(e) = ctx.services.storage.remove(&old.path).await {
            log::warn!(
                "p{project_id} s{scenario_id}: could not remove superseded road network {}: {e}",
                old.path
            );
        }
    }

    let bytes = fetch.await?;

    let now = Utc::now();
    let name = format!("road-network_{}", now.timestamp_millis());
    let path = blob_path(scenario_id, &name);

    ctx.services.storage.put(&path, bytes).await?;

    let row = NewScenarioFile {
        project_id,
        scenario_id,
        name,
        file_type: FileType::RoadNetwork,
        subtype: None,
        path: path.clone(),
        created_at: now,
        updated_at: now,
    };
    db.run(move |conn| insert_scenario_file(conn, &row)).await?;

    Ok(path)
}

/// Size gate, structured import, event and vector tiles.
async fn process_raw_file(
    ctx: &SetupContext,
    path: String,
) -> Result<RoadNetworkOutcome, SetupError> {
    let (project_id, scenario_id) = (ctx.project_id, ctx.scenario_id);
    let services = &ctx.services;

    services
        .import
        .remove_database(project_id, scenario_id)
        .await?;

    let info = services.storage.stat(&path).await?;
    let active_editing = info.size_bytes < services.road_net_edit_max;

    let value = active_editing.to_string();
    services
        .db
        .run(move |conn| {
            set_setting(conn, scenario_id, SettingKey::RnActiveEditing, &value)
        })
        .await?;

    if active_editing {
        ctx.op
            .log(LOG_CODE, "Importing road network into the editing database")
            .await?;
        let bytes = services.storage.get(&path).await?;
        services
            .import
            .import_road_network(project_id, scenario_id, bytes)
            .await?;
    } else {
        log::info!(
            "p{project_id} s{scenario_id}: road network is {} bytes, over the {} byte editing limit",
            info.size_bytes,
            services.road_net_edit_max
        );
        ctx.op
            .log(LOG_CODE, "Road network too large for editing")
            .await?;
    }

    ctx.events
        .emit(SetupEvent::RoadNetworkActiveEditing(active_editing))?;

    let vector_tiles = services.vector_tiles.as_ref().map(|builder| {
        let builder = Arc::clone(builder);
        let source_path = path.clone();
        tokio::spawn(async move {
            if let Err(e) = builder.build(project_id, scenario_id, &source_path).await {
                log::error!("p{project_id} s{scenario_id}: vector tiles failed: {e}");
            }
        })
    });

    Ok(RoadNetworkOutcome {
        path,
        size_bytes: info.size_bytes,
        active_editing,
        vector_tiles,
    })
}
