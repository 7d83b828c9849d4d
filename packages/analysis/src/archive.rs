//! Zip download of a scenario's exported result files.

use std::io::{Cursor, Write};

use ram_database::Db;
use ram_database::scenario_files::list_scenario_files;
use ram_database_models::ResultsFormat;
use ram_storage::{BlobStore, StorageError};
use zip::result::ZipError;

use crate::AnalysisError;

/// Bundles every result file of `format` into a zip archive, one entry per
/// file named `{name}.{format}`.
///
/// # Errors
///
/// Returns [`AnalysisError::NotFound`] if the scenario has no result files
/// in this format or one of their blobs is missing,
/// [`AnalysisError::Storage`] or [`AnalysisError::Db`] if a read fails, and
/// [`AnalysisError::Archive`] if the zip cannot be written.
pub async fn results_archive(
    db: &Db,
    storage: &dyn BlobStore,
    project_id: i64,
    scenario_id: i64,
    format: ResultsFormat,
) -> Result<Vec<u8>, AnalysisError> {
    let files = db
        .run(move |conn| list_scenario_files(conn, project_id, scenario_id, format.file_type()))
        .await?;

    if files.is_empty() {
        return Err(AnalysisError::NotFound {
            message: format!("Results not found for p{project_id} s{scenario_id} ({format})"),
        });
    }

    let mut entries = Vec::with_capacity(files.len());
    for file in files {
        let content = storage.get(&file.path).await.map_err(|e| match e {
            StorageError::NotFound { path } => AnalysisError::NotFound {
                message: format!("File not found in storage bucket: {path}"),
            },
            e => AnalysisError::Storage(e),
        })?;
        entries.push((format!("{}.{format}", file.name), content));
    }

    let archive = write_zip(&entries)?;

    log::debug!(
        "p{project_id} s{scenario_id}: zipped {} {format} result files ({} bytes)",
        entries.len(),
        archive.len()
    );

    Ok(archive)
}

fn write_zip(entries: &[(String, Vec<u8>)]) -> Result<Vec<u8>, ZipError> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);

    for (name, content) in entries {
        writer.start_file(name.as_str(), options)?;
        writer.write_all(content)?;
    }

    Ok(writer.finish()?.into_inner())
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use chrono::Utc;
    use ram_database::scenario_files::insert_scenario_file;
    use ram_database_models::{FileType, NewScenarioFile};
    use ram_storage::LocalBlobStore;

    use super::*;

    async fn add_file(db: &Db, scenario_id: i64, name: &str, file_type: FileType, path: &str) {
        let file = NewScenarioFile {
            project_id: 1,
            scenario_id,
            name: name.to_string(),
            file_type,
            subtype: None,
            path: path.to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        db.run(move |conn| insert_scenario_file(conn, &file))
            .await
            .unwrap();
    }

    fn read_entry(archive: &[u8], name: &str) -> String {
        let mut zip = zip::ZipArchive::new(Cursor::new(archive)).unwrap();
        let mut entry = zip.by_name(name).unwrap();
        let mut content = String::new();
        entry.read_to_string(&mut content).unwrap();
        content
    }

    #[tokio::test]
    async fn zips_every_file_of_the_format() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalBlobStore::new(dir.path());
        let db = Db::open_in_memory().unwrap();

        storage
            .put("scenario-10/results-school.csv", b"origin,time\nBoquim,300\n".to_vec())
            .await
            .unwrap();
        storage
            .put("scenario-10/results-bank.csv", b"origin,time\nBoquim,900\n".to_vec())
            .await
            .unwrap();
        storage
            .put("scenario-10/results.geojson", b"{}".to_vec())
            .await
            .unwrap();
        add_file(&db, 10, "results-school", FileType::ResultsCsv, "scenario-10/results-school.csv").await;
        add_file(&db, 10, "results-bank", FileType::ResultsCsv, "scenario-10/results-bank.csv").await;
        add_file(&db, 10, "results-all", FileType::ResultsGeojson, "scenario-10/results.geojson").await;

        let archive = results_archive(&db, &storage, 1, 10, ResultsFormat::Csv)
            .await
            .unwrap();

        let zip = zip::ZipArchive::new(Cursor::new(archive.as_slice())).unwrap();
        let mut names: Vec<&str> = zip.file_names().collect();
        names.sort_unstable();
        assert_eq!(names, vec!["results-bank.csv", "results-school.csv"]);
        assert_eq!(
            read_entry(&archive, "results-school.csv"),
            "origin,time\nBoquim,300\n"
        );
    }

    #[tokio::test]
    async fn no_result_files_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalBlobStore::new(dir.path());
        let db = Db::open_in_memory().unwrap();
        add_file(&db, 11, "results-all", FileType::ResultsCsv, "scenario-11/results.csv").await;

        let err = results_archive(&db, &storage, 1, 10, ResultsFormat::Csv)
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::NotFound { .. }), "{err:?}");

        let err = results_archive(&db, &storage, 1, 11, ResultsFormat::Geojson)
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::NotFound { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn missing_blob_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalBlobStore::new(dir.path());
        let db = Db::open_in_memory().unwrap();
        add_file(&db, 10, "results-school", FileType::ResultsCsv, "scenario-10/gone.csv").await;

        let err = results_archive(&db, &storage, 1, 10, ResultsFormat::Csv)
            .await
            .unwrap_err();
        match err {
            AnalysisError::NotFound { message } => assert!(message.contains("scenario-10/gone.csv")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
