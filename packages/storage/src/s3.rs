//! S3-compatible blob store.

use aws_config::Region;
use aws_sdk_s3::config::{Credentials, StalledStreamProtectionConfig};
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::operation::head_object::HeadObjectError;
use aws_sdk_s3::primitives::ByteStream;

use crate::{BlobStore, FileInfo, StorageError, megabytes};

/// Connection settings for an S3-compatible bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Settings {
    /// Bucket holding every project's files.
    pub bucket: String,
    /// Custom endpoint (`MinIO`, R2). `None` uses the AWS default.
    pub endpoint: Option<String>,
    /// Region name. S3-compatible services usually accept `auto`.
    pub region: String,
    /// Access key id.
    pub access_key: String,
    /// Secret access key.
    pub secret_key: String,
}

/// Blob store backed by a single S3 bucket.
pub struct S3BlobStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl std::fmt::Debug for S3BlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3BlobStore")
            .field("bucket", &self.bucket)
            .finish_non_exhaustive()
    }
}

impl S3BlobStore {
    /// Creates a client for the configured bucket.
    ///
    /// Path-style addressing is always used so self-hosted endpoints work
    /// without wildcard DNS.
    #[must_use]
    pub fn new(settings: &S3Settings) -> Self {
        let creds = Credentials::new(
            &settings.access_key,
            &settings.secret_key,
            None,
            None,
            "ram-config",
        );

        let mut builder = aws_sdk_s3::Config::builder()
            .region(Region::new(settings.region.clone()))
            .credentials_provider(creds)
            .force_path_style(true)
            .stalled_stream_protection(StalledStreamProtectionConfig::disabled());

        if let Some(endpoint) = &settings.endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        Self {
            client: aws_sdk_s3::Client::from_conf(builder.build()),
            bucket: settings.bucket.clone(),
        }
    }

    /// Bucket this store reads and writes.
    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait::async_trait]
impl BlobStore for S3BlobStore {
    async fn get(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        log::debug!("Reading s3://{}/{path}", self.bucket);

        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
            .map_err(|err| {
                if err
                    .as_service_error()
                    .is_some_and(GetObjectError::is_no_such_key)
                {
                    return StorageError::NotFound {
                        path: path.to_string(),
                    };
                }
                StorageError::Download {
                    bucket: self.bucket.clone(),
                    key: path.to_string(),
                    source: Box::new(err),
                }
            })?;

        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| StorageError::Download {
                bucket: self.bucket.clone(),
                key: path.to_string(),
                source: Box::new(e),
            })?;

        Ok(bytes.into_bytes().to_vec())
    }

    async fn put(&self, path: &str, bytes: Vec<u8>) -> Result<(), StorageError> {
        log::info!(
            "Writing s3://{}/{path} ({:.1} MB)",
            self.bucket,
            megabytes(bytes.len() as u64)
        );

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(path)
            .body(ByteStream::from(bytes))
            .content_type("application/octet-stream")
            .send()
            .await
            .map_err(|e| StorageError::Upload {
                bucket: self.bucket.clone(),
                key: path.to_string(),
                source: Box::new(e),
            })?;

        Ok(())
    }

    async fn stat(&self, path: &str) -> Result<FileInfo, StorageError> {
        let result = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await;

        match result {
            Ok(output) => {
                let size = output.content_length().unwrap_or(0);
                #[allow(clippy::cast_sign_loss)] // S3 content-length is non-negative
                let size_bytes = size.max(0) as u64;
                Ok(FileInfo {
                    path: path.to_string(),
                    size_bytes,
                })
            }
            Err(err) => {
                if err
                    .as_service_error()
                    .is_some_and(HeadObjectError::is_not_found)
                {
                    return Err(StorageError::NotFound {
                        path: path.to_string(),
                    });
                }
                Err(StorageError::Head {
                    bucket: self.bucket.clone(),
                    key: path.to_string(),
                    source: Box::new(err),
                })
            }
        }
    }

    async fn remove(&self, path: &str) -> Result<(), StorageError> {
        log::info!("Deleting s3://{}/{path}", self.bucket);

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
            .map_err(|e| StorageError::Delete {
                bucket: self.bucket.clone(),
                key: path.to_string(),
                source: Box::new(e),
            })?;

        Ok(())
    }
}
