#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Blob storage for raw scenario files.
//!
//! Road networks, POI files and admin boundaries are stored as opaque blobs
//! addressed by a slash-separated path such as
//! `scenario-3/road-network_1718000000000`. The [`BlobStore`] trait is the
//! only surface the rest of the workspace sees; two implementations are
//! provided:
//!
//! - [`S3BlobStore`] for any S3-compatible bucket (`MinIO`, R2, AWS).
//! - [`LocalBlobStore`] which maps paths onto a local directory. Used for
//!   development and tests.

mod local;
mod s3;

pub use local::LocalBlobStore;
pub use s3::{S3BlobStore, S3Settings};

/// Errors that can occur during blob storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The blob does not exist.
    #[error("Blob not found: {path}")]
    NotFound {
        /// Path that was requested.
        path: String,
    },

    /// The path is empty, absolute, or escapes the store root.
    #[error("Invalid blob path: {path:?}")]
    InvalidPath {
        /// The rejected path.
        path: String,
    },

    /// S3 `GetObject` failed.
    #[error("Failed to download s3://{bucket}/{key}: {source}")]
    Download {
        /// Bucket name.
        bucket: String,
        /// Object key.
        key: String,
        /// Underlying SDK error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// S3 `PutObject` failed.
    #[error("Failed to upload s3://{bucket}/{key}: {source}")]
    Upload {
        /// Bucket name.
        bucket: String,
        /// Object key.
        key: String,
        /// Underlying SDK error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// S3 `HeadObject` failed.
    #[error("Failed to head s3://{bucket}/{key}: {source}")]
    Head {
        /// Bucket name.
        bucket: String,
        /// Object key.
        key: String,
        /// Underlying SDK error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// S3 `DeleteObject` failed.
    #[error("Failed to delete s3://{bucket}/{key}: {source}")]
    Delete {
        /// Bucket name.
        bucket: String,
        /// Object key.
        key: String,
        /// Underlying SDK error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// I/O error reading or writing local files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Size information about a stored blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// Path the blob is stored under.
    pub path: String,
    /// Size of the blob in bytes.
    pub size_bytes: u64,
}

/// Opaque blob storage addressed by path.
#[async_trait::async_trait]
pub trait BlobStore: Send + Sync {
    /// Reads the full contents of a blob.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if the blob does not exist, or a
    /// backend error if the read fails.
    async fn get(&self, path: &str) -> Result<Vec<u8>, StorageError>;

    /// Writes a blob, replacing any existing blob at the same path.
    ///
    /// # Errors
    ///
    /// Returns a backend error if the write fails.
    async fn put(&self, path: &str, bytes: Vec<u8>) -> Result<(), StorageError>;

    /// Returns size information about a blob.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if the blob does not exist, or a
    /// backend error if the lookup fails.
    async fn stat(&self, path: &str) -> Result<FileInfo, StorageError>;

    /// Removes a blob. Removing a missing blob succeeds.
    ///
    /// # Errors
    ///
    /// Returns a backend error if the removal fails.
    async fn remove(&self, path: &str) -> Result<(), StorageError>;
}

/// Formats a byte count as megabytes for log messages.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn megabytes(bytes: u64) -> f64 {
    bytes as f64 / 1_048_576.0
}
