//! In-memory publisher
//!
//! Holds uploaded objects in a map. Useful for tests and for running the
//! service without object storage; data is lost on restart.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::{content_type, SegmentPublisher, StorageError, StoredObject};

struct Entry {
    data: Bytes,
    written_at: DateTime<Utc>,
}

/// Publisher backed by a process-local map
#[derive(Default)]
pub struct MemoryPublisher {
    objects: Mutex<BTreeMap<String, Entry>>,
    uploads: AtomicU64,
    deleted_prefixes: Mutex<Vec<String>>,
    fail_uploads: AtomicBool,
}

impl MemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following upload fail (or succeed again)
    pub fn fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    /// Number of successful uploads so far, overwrites included
    pub fn upload_count(&self) -> u64 {
        self.uploads.load(Ordering::SeqCst)
    }

    /// Prefixes passed to `delete_prefix`, in call order
    pub async fn deleted_prefixes(&self) -> Vec<String> {
        self.deleted_prefixes.lock().await.clone()
    }

    /// Read back an object
    pub async fn get(&self, key: &str) -> Option<Bytes> {
        self.objects.lock().await.get(key).map(|e| e.data.clone())
    }

    /// Number of stored objects
    pub async fn object_count(&self) -> usize {
        self.objects.lock().await.len()
    }
}

#[async_trait]
impl SegmentPublisher for MemoryPublisher {
    async fn upload(&self, local_path: &Path, remote_key: &str) -> Result<(), StorageError> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(StorageError::Rejected {
                key: remote_key.to_string(),
                reason: "uploads disabled".into(),
            });
        }

        let data = Bytes::from(tokio::fs::read(local_path).await?);
        let size = data.len();

        self.objects.lock().await.insert(
            remote_key.to_string(),
            Entry {
                data,
                written_at: Utc::now(),
            },
        );
        self.uploads.fetch_add(1, Ordering::SeqCst);

        tracing::trace!(key = remote_key, size = size, "Stored object");
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<usize, StorageError> {
        self.deleted_prefixes.lock().await.push(prefix.to_string());

        let mut objects = self.objects.lock().await;
        let before = objects.len();
        objects.retain(|key, _| !key.starts_with(prefix));

        Ok(before - objects.len())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<StoredObject>, StorageError> {
        let objects = self.objects.lock().await;

        Ok(objects
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, entry)| StoredObject {
                key: key.clone(),
                size: entry.data.len() as u64,
                last_modified: Some(entry.written_at),
                content_type: content_type(key),
            })
            .collect())
    }

    async fn signed_url(
        &self,
        _remote_key: &str,
        _expires: Duration,
    ) -> Result<String, StorageError> {
        Err(StorageError::Unsupported("signed URLs"))
    }
}
