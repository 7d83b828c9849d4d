//! Blob store rooted in a local directory.

use std::path::{Component, Path, PathBuf};

use crate::{BlobStore, FileInfo, StorageError, megabytes};

/// Stores each blob as a file under `root`, creating intermediate
/// directories on write.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    /// Creates a store rooted at `root`. The directory is created lazily.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of the store.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a blob path onto the filesystem, rejecting paths that would
    /// escape the root.
    fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(path);
        let valid = !path.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));

        if !valid {
            return Err(StorageError::InvalidPath {
                path: path.to_string(),
            });
        }

        Ok(self.root.join(relative))
    }
}

fn not_found_or_io(path: &str, err: std::io::Error) -> StorageError {
    if err.kind() == std::io::ErrorKind::NotFound {
        StorageError::NotFound {
            path: path.to_string(),
        }
    } else {
        StorageError::Io(err)
    }
}

#[async_trait::async_trait]
impl BlobStore for LocalBlobStore {
    async fn get(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let file = self.resolve(path)?;
        tokio::fs::read(&file)
            .await
            .map_err(|e| not_found_or_io(path, e))
    }

    async fn put(&self, path: &str, bytes: Vec<u8>) -> Result<(), StorageError> {
        let file = self.resolve(path)?;
        if let Some(parent) = file.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        log::info!(
            "Writing {} ({:.1} MB)",
            file.display(),
            megabytes(bytes.len() as u64)
        );

        tokio::fs::write(&file, bytes).await?;
        Ok(())
    }

    async fn stat(&self, path: &str) -> Result<FileInfo, StorageError> {
        let file = self.resolve(path)?;
        let meta = tokio::fs::metadata(&file)
            .await
            .map_err(|e| not_found_or_io(path, e))?;

        Ok(FileInfo {
            path: path.to_string(),
            size_bytes: meta.len(),
        })
    }

    async fn remove(&self, path: &str) -> Result<(), StorageError> {
        let file = self.resolve(path)?;
        match tokio::fs::remove_file(&file).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_get_stat_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path());

        store
            .put("scenario-1/road-network_1", b"<osm/>".to_vec())
            .await
            .unwrap();

        assert_eq!(
            store.get("scenario-1/road-network_1").await.unwrap(),
            b"<osm/>"
        );
        assert_eq!(
            store.stat("scenario-1/road-network_1").await.unwrap(),
            FileInfo {
                path: "scenario-1/road-network_1".to_string(),
                size_bytes: 6,
            }
        );

        store.remove("scenario-1/road-network_1").await.unwrap();
        assert!(matches!(
            store.get("scenario-1/road-network_1").await,
            Err(StorageError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn put_overwrites_existing_blob() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path());

        store.put("a/b", b"first".to_vec()).await.unwrap();
        store.put("a/b", b"second!".to_vec()).await.unwrap();

        assert_eq!(store.stat("a/b").await.unwrap().size_bytes, 7);
    }

    #[tokio::test]
    async fn missing_blob_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path());

        assert!(matches!(
            store.stat("nope").await,
            Err(StorageError::NotFound { .. })
        ));
        store.remove("nope").await.unwrap();
    }

    #[tokio::test]
    async fn rejects_escaping_paths() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path());

        for path in ["", "../etc/passwd", "/abs/path", "a/../../b"] {
            assert!(
                matches!(
                    store.put(path, Vec::new()).await,
                    Err(StorageError::InvalidPath { .. })
                ),
                "{path:?} should be rejected"
            );
        }
    }
}
