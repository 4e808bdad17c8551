// Object Storage Service (OSS) publisher
//
// Supports AWS S3, MinIO and any S3-compatible storage through OpenDAL.
// Enabled with the `oss` feature.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use opendal::{services::S3, Operator};

use super::{content_type, SegmentPublisher, StorageError, StoredObject};

/// OSS publisher configuration
#[derive(Debug, Clone)]
pub struct OssConfig {
    /// Endpoint (e.g., "http://minio:9000" or "https://s3.amazonaws.com")
    pub endpoint: String,
    /// Access key ID
    pub access_key_id: String,
    /// Secret access key
    pub secret_access_key: String,
    /// Bucket name
    pub bucket: String,
    /// Region
    pub region: String,
    /// Public URL prefix for playback (e.g., a CDN); empty to use presigned URLs
    pub cdn_base_url: String,
}

impl Default for OssConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:9000".into(),
            access_key_id: "minioadmin".into(),
            secret_access_key: "minioadmin".into(),
            bucket: "hls-streams".into(),
            region: "us-east-1".into(),
            cdn_base_url: String::new(),
        }
    }
}

/// Publisher writing to an S3-compatible bucket
pub struct OssPublisher {
    config: OssConfig,
    operator: Operator,
}

impl OssPublisher {
    /// Build the publisher; does not contact the backend
    pub fn new(config: OssConfig) -> Result<Self, StorageError> {
        tracing::info!(
            bucket = %config.bucket,
            endpoint = %config.endpoint,
            "Initializing OSS publisher"
        );

        let builder = S3::default()
            .endpoint(&config.endpoint)
            .access_key_id(&config.access_key_id)
            .secret_access_key(&config.secret_access_key)
            .bucket(&config.bucket)
            .region(&config.region);

        let operator = Operator::new(builder)?.finish();

        Ok(Self { config, operator })
    }

    /// Public URL for direct access, when a CDN base is configured
    pub fn public_url(&self, remote_key: &str) -> Option<String> {
        if self.config.cdn_base_url.is_empty() {
            None
        } else {
            Some(format!(
                "{}/{}",
                self.config.cdn_base_url.trim_end_matches('/'),
                remote_key
            ))
        }
    }
}

#[async_trait]
impl SegmentPublisher for OssPublisher {
    async fn upload(&self, local_path: &Path, remote_key: &str) -> Result<(), StorageError> {
        let data = tokio::fs::read(local_path).await?;
        let size = data.len();
        let mime = content_type(remote_key);

        self.operator
            .write_with(remote_key, data)
            .content_type(mime)
            .await?;

        tracing::debug!(
            local_path = %local_path.display(),
            key = remote_key,
            size = size,
            content_type = mime,
            "Uploaded object"
        );
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<usize, StorageError> {
        let entries = self.operator.list_with(prefix).recursive(true).await?;

        let mut deleted = 0;
        for entry in entries.iter().filter(|e| e.metadata().is_file()) {
            match self.operator.delete(entry.path()).await {
                Ok(()) => deleted += 1,
                Err(e) => {
                    tracing::error!(key = entry.path(), error = %e, "Failed to delete object");
                }
            }
        }

        tracing::info!(prefix = prefix, deleted = deleted, "Deleted stream objects");
        Ok(deleted)
    }

    async fn list(&self, prefix: &str) -> Result<Vec<StoredObject>, StorageError> {
        let entries = self.operator.list_with(prefix).recursive(true).await?;

        Ok(entries
            .into_iter()
            .filter(|e| e.metadata().is_file())
            .map(|e| StoredObject {
                key: e.path().to_string(),
                size: e.metadata().content_length(),
                last_modified: e.metadata().last_modified(),
                content_type: content_type(e.path()),
            })
            .collect())
    }

    async fn signed_url(
        &self,
        remote_key: &str,
        expires: Duration,
    ) -> Result<String, StorageError> {
        let request = self.operator.presign_read(remote_key, expires).await?;
        Ok(request.uri().to_string())
    }
}
