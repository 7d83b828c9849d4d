//! Publishes the project's admin boundaries to the run.

use std::sync::Arc;

use geojson::FeatureCollection;
use ram_database::scenario_files::get_project_file;
use ram_database_models::FileType;

use crate::SetupError;
use crate::context::SetupContext;
use crate::events::SetupEvent;

/// Operation log code for admin boundary progress.
pub const LOG_CODE: &str = "process:admin-bounds";

/// Reads the project's `admin-bounds` `GeoJSON` and emits
/// `admin-bounds:data`.
///
/// # Errors
///
/// Returns [`SetupError::NotFound`] if the project has no admin-bounds
/// file, [`SetupError::InvalidAdminBounds`] if it is not a feature
/// collection, or a storage/database error.
pub async fn process(ctx: &SetupContext) -> Result<(), SetupError> {
    let project_id = ctx.project_id;

    ctx.op.log(LOG_CODE, "Processing admin boundaries").await?;

    let file = ctx
        .services
        .db
        .run(move |conn| get_project_file(conn, project_id, FileType::AdminBounds))
        .await?
        .ok_or_else(|| SetupError::NotFound {
            what: format!("admin bounds of project {project_id}"),
        })?;

    let bytes = ctx.services.storage.get(&file.path).await?;
    let fc: FeatureCollection =
        serde_json::from_slice(&bytes).map_err(|e| SetupError::InvalidAdminBounds {
            message: format!("{}: {e}", file.path),
        })?;

    log::info!(
        "p{project_id} s{}: {} admin boundaries loaded",
        ctx.scenario_id,
        fc.features.len()
    );

    ctx.events.emit(SetupEvent::AdminBoundsData(Arc::new(fc)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{ADMIN_BOUNDS_JSON, Harness};

    #[tokio::test]
    async fn emits_the_project_feature_collection() {
        let h = Harness::new().await;
        h.upload_admin_bounds(ADMIN_BOUNDS_JSON).await;

        process(&h.ctx).await.unwrap();

        let fc = h.ctx.events.wait_for_admin_bounds().await;
        assert_eq!(fc.features.len(), 2);
        assert_eq!(h.operation_logs().await[0].code, LOG_CODE);
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let h = Harness::new().await;
        let err = process(&h.ctx).await.unwrap_err();
        assert!(matches!(err, SetupError::NotFound { .. }));
    }

    #[tokio::test]
    async fn malformed_geojson_is_rejected() {
        let h = Harness::new().await;
        h.upload_admin_bounds(r#"{"type": "Point", "coordinates": [0, 0]}"#)
            .await;

        let err = process(&h.ctx).await.unwrap_err();
        assert!(matches!(err, SetupError::InvalidAdminBounds { .. }));
    }
}
