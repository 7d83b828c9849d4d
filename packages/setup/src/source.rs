//! Where a scenario's road network comes from.

use ram_catalog::CatalogParams;
use ram_database::Db;
use ram_database_models::{FileType, SourceDataRow};

use crate::SetupError;

/// Road network source configured for a scenario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoadNetworkSource {
    /// A file uploaded together with the scenario.
    File,
    /// Live extraction from `OpenStreetMap` over the admin-bounds bbox.
    Osm,
    /// Download from the data catalog.
    Catalog(CatalogParams),
}

impl RoadNetworkSource {
    /// `source_type` value persisted for this variant.
    #[must_use]
    pub const fn source_type(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Osm => "osm",
            Self::Catalog(_) => "wbcatalog",
        }
    }

    /// Interprets a persisted source row.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::Config`] if the source type is unknown or the
    /// catalog parameters are missing or malformed.
    pub fn from_row(row: &SourceDataRow) -> Result<Self, SetupError> {
        match row.source_type.as_str() {
            "file" => Ok(Self::File),
            "osm" => Ok(Self::Osm),
            "wbcatalog" => {
                let data = row.data.as_deref().ok_or_else(|| SetupError::Config {
                    message: format!(
                        "Catalog source of scenario {} has no parameters",
                        row.scenario_id
                    ),
                })?;
                let params = serde_json::from_str(data).map_err(|e| SetupError::Config {
                    message: format!(
                        "Malformed catalog parameters for scenario {}: {e}",
                        row.scenario_id
                    ),
                })?;
                Ok(Self::Catalog(params))
            }
            other => Err(SetupError::Config {
                message: format!(
                    "Unknown road network source {other:?} for scenario {}",
                    row.scenario_id
                ),
            }),
        }
    }
}

/// Reads the road network source of a scenario.
///
/// # Errors
///
/// Returns [`SetupError::NotFound`] if the scenario has no road network
/// source row, or [`SetupError::Config`] if the row cannot be interpreted.
pub async fn resolve(
    db: &Db,
    project_id: i64,
    scenario_id: i64,
) -> Result<RoadNetworkSource, SetupError> {
    let name = FileType::RoadNetwork.as_ref().to_string();
    let row = db
        .run(move |conn| {
            ram_database::source_data::get_source_data(conn, project_id, scenario_id, &name)
        })
        .await?
        .ok_or_else(|| SetupError::NotFound {
            what: format!("road network source of project {project_id} scenario {scenario_id}"),
        })?;

    RoadNetworkSource::from_row(&row)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn db_with_source(source_type: &str, data: Option<&str>) -> Db {
        let db = Db::open_in_memory().unwrap();
        let source_type = source_type.to_string();
        let data = data.map(str::to_string);
        db.run(move |conn| {
            ram_database::source_data::insert_source_data(
                conn,
                1,
                10,
                "road-network",
                &source_type,
                data.as_deref(),
            )
        })
        .await
        .unwrap();
        db
    }

    #[tokio::test]
    async fn resolves_each_kind() {
        let db = db_with_source("file", None).await;
        assert_eq!(resolve(&db, 1, 10).await.unwrap(), RoadNetworkSource::File);

        let db = db_with_source("osm", None).await;
        assert_eq!(resolve(&db, 1, 10).await.unwrap(), RoadNetworkSource::Osm);

        let db = db_with_source("wbcatalog", Some(r#"{"resourceId": "r-1"}"#)).await;
        assert_eq!(
            resolve(&db, 1, 10).await.unwrap(),
            RoadNetworkSource::Catalog(CatalogParams {
                resource_id: "r-1".to_string()
            })
        );
    }

    #[tokio::test]
    async fn missing_row_is_not_found() {
        let db = Db::open_in_memory().unwrap();
        let err = resolve(&db, 1, 10).await.unwrap_err();
        assert!(matches!(err, SetupError::NotFound { .. }));
    }

    #[tokio::test]
    async fn unknown_type_is_config_error() {
        let db = db_with_source("ftp", None).await;
        let err = resolve(&db, 1, 10).await.unwrap_err();
        assert!(matches!(err, SetupError::Config { .. }));
    }

    #[tokio::test]
    async fn malformed_catalog_params_are_config_error() {
        let db = db_with_source("wbcatalog", Some("not json")).await;
        assert!(matches!(
            resolve(&db, 1, 10).await.unwrap_err(),
            SetupError::Config { .. }
        ));

        let db = db_with_source("wbcatalog", None).await;
        assert!(matches!(
            resolve(&db, 1, 10).await.unwrap_err(),
            SetupError::Config { .. }
        ));
    }

    #[test]
    fn source_type_round_trips_through_row() {
        let row = SourceDataRow {
            id: 1,
            project_id: 1,
            scenario_id: 10,
            name: "road-network".to_string(),
            source_type: RoadNetworkSource::Osm.source_type().to_string(),
            data: None,
        };
        assert_eq!(RoadNetworkSource::from_row(&row).unwrap(), RoadNetworkSource::Osm);
    }
}
