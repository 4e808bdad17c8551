//! In-memory registry implementation
//!
//! Keeps stream records in a map behind a `RwLock`. Used by tests and by
//! deployments that do not need status to survive a restart.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::error::RegistryError;
use super::key::StreamKey;
use super::status::{StreamRecord, StreamStatus};
use super::StreamRegistry;
use crate::stats::StatsSnapshot;

/// Registry that lives for the lifetime of the process
pub struct MemoryRegistry {
    /// Map of stream key to its record
    streams: RwLock<HashMap<StreamKey, StreamRecord>>,

    /// Next row id to hand out
    next_id: AtomicI64,
}

impl MemoryRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            streams: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    /// Get the status for a stream, if it has a row
    pub async fn status(&self, key: &StreamKey) -> Option<StreamStatus> {
        self.streams.read().await.get(key).map(|r| r.status)
    }

    /// Number of rows
    pub async fn len(&self) -> usize {
        self.streams.read().await.len()
    }

    /// Whether the registry has no rows
    pub async fn is_empty(&self) -> bool {
        self.streams.read().await.is_empty()
    }

    fn new_record(&self, key: &StreamKey) -> StreamRecord {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        tracing::info!(stream = %key, id = id, "Created stream record");
        StreamRecord::new(id, key.clone())
    }

    async fn write_status(&self, key: &StreamKey, status: StreamStatus) {
        let mut streams = self.streams.write().await;

        let record = streams
            .entry(key.clone())
            .or_insert_with(|| self.new_record(key));
        record.transition(status);

        tracing::debug!(stream = %key, status = %status, "Stream status updated");
    }
}

impl Default for MemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StreamRegistry for MemoryRegistry {
    async fn create_if_absent(&self, key: &StreamKey) -> Result<StreamRecord, RegistryError> {
        let mut streams = self.streams.write().await;

        let record = streams
            .entry(key.clone())
            .or_insert_with(|| self.new_record(key));

        Ok(record.clone())
    }

    async fn set_active(&self, key: &StreamKey) -> Result<(), RegistryError> {
        self.write_status(key, StreamStatus::Active).await;
        Ok(())
    }

    async fn set_inactive(&self, key: &StreamKey) -> Result<(), RegistryError> {
        self.write_status(key, StreamStatus::Inactive).await;
        Ok(())
    }

    async fn set_error(&self, key: &StreamKey) -> Result<(), RegistryError> {
        self.write_status(key, StreamStatus::Error).await;
        Ok(())
    }

    async fn get(&self, key: &StreamKey) -> Result<Option<StreamRecord>, RegistryError> {
        Ok(self.streams.read().await.get(key).cloned())
    }

    async fn list_active(&self) -> Result<Vec<StreamRecord>, RegistryError> {
        let streams = self.streams.read().await;

        let mut active: Vec<StreamRecord> = streams
            .values()
            .filter(|r| r.status == StreamStatus::Active)
            .cloned()
            .collect();
        active.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

        Ok(active)
    }

    async fn stats(&self) -> Result<StatsSnapshot, RegistryError> {
        let streams = self.streams.read().await;

        let mut stats = StatsSnapshot {
            total_streams: streams.len() as u64,
            ..Default::default()
        };
        for record in streams.values() {
            match record.status {
                StreamStatus::Active => stats.active_streams += 1,
                StreamStatus::Inactive => stats.inactive_streams += 1,
                StreamStatus::Error => stats.error_streams += 1,
            }
        }

        Ok(stats)
    }
}
