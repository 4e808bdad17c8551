//! Encoding orchestrator
//!
//! Keeps at most one transcoder running per stream key and supervises it:
//!
//! ```text
//!                    start_encoding(key)
//!                           │
//!            reserve slot (Pending) ── taken? ──► no-op
//!                           │
//!           registry.set_active, mkdir, engine.spawn
//!                           │
//!                  slot ──► Running
//!                  ┌────────┴────────┐
//!               watcher           monitor
//!          (exit or cancel)   (upload every tick
//!                  │           while slot is ours)
//!         registry + cleanup
//!                  │
//!            retire slot ──► TaskEvent::Retired
//! ```
//!
//! `stop_encoding` cancels and removes the slot in one step; the watcher then
//! tears the process down and cleans up storage. The registry is only a
//! reporting store: the active-set decides what is running.

mod active;
pub mod config;
pub mod monitor;
pub mod task;
mod watcher;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

pub use active::TaskInfo;
pub use config::{EncoderConfig, IngestSource};
pub use monitor::UploadReport;
pub use task::{TaskEvent, TaskId, TaskOutcome, TaskPhase};

use active::{ActiveSet, Reservation, TaskSlot};
use crate::engine::TranscodingEngine;
use crate::error::{Error, Result, StartStage};
use crate::event::{StreamAction, StreamEvent};
use crate::registry::{StreamKey, StreamRecord, StreamRegistry, StreamStatus};
use crate::stats::{EncoderCounters, StatsSnapshot};
use crate::storage::SegmentPublisher;

/// Supervises one encoding task per stream key
pub struct Orchestrator {
    config: EncoderConfig,
    engine: Arc<dyn TranscodingEngine>,
    registry: Arc<dyn StreamRegistry>,
    publisher: Option<Arc<dyn SegmentPublisher>>,
    active: ActiveSet,
    next_task_id: AtomicU64,
    tracker: TaskTracker,
    events: broadcast::Sender<TaskEvent>,
    counters: EncoderCounters,
}

impl Orchestrator {
    /// Create an orchestrator without durable storage
    pub fn new(
        config: EncoderConfig,
        engine: Arc<dyn TranscodingEngine>,
        registry: Arc<dyn StreamRegistry>,
    ) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity);

        Self {
            config,
            engine,
            registry,
            publisher: None,
            active: ActiveSet::new(),
            next_task_id: AtomicU64::new(1),
            tracker: TaskTracker::new(),
            events,
            counters: EncoderCounters::new(),
        }
    }

    /// Publish output artifacts through `publisher`
    pub fn with_publisher(mut self, publisher: Arc<dyn SegmentPublisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    /// Get the orchestrator configuration
    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// Start encoding `key` unless a task for it already exists
    ///
    /// Returns once the transcoder is spawned; it does not wait for output.
    pub async fn start_encoding(self: &Arc<Self>, key: &StreamKey) -> Result<()> {
        let task_id = self.next_task_id.fetch_add(1, Ordering::Relaxed);
        let cancel = CancellationToken::new();
        let output_dir = self.config.output_dir(key);

        let slot = TaskSlot::pending(task_id, cancel.clone(), output_dir.clone());
        match self.active.reserve(key, slot).await {
            Reservation::Reserved => {}
            Reservation::Occupied(current) => {
                tracing::info!(stream = %key, task_id = current, "Stream already encoding");
                return Ok(());
            }
        }

        tracing::info!(stream = %key, task_id, "Starting encoding");

        if let Err(e) = self.registry.create_if_absent(key).await {
            let err = Error::from(e);
            tracing::error!(stream = %key, error = %err, "Failed to register stream");
        }
        self.write_status(key, StreamStatus::Active).await;

        if let Err(source) = tokio::fs::create_dir_all(&output_dir).await {
            return Err(self
                .abort_start(key, task_id, StartStage::OutputDirectory, source)
                .await);
        }

        let input = self.config.ingest.url(key);
        let process = match self.engine.spawn(&input, &output_dir) {
            Ok(process) => process,
            Err(source) => {
                return Err(self
                    .abort_start(key, task_id, StartStage::Spawn, source)
                    .await);
            }
        };
        self.counters.record_spawn();

        let pid = process.id();
        let running = self.active.advance(key, task_id, TaskPhase::Running).await;

        tracing::info!(
            stream = %key,
            task_id,
            pid = ?pid,
            input = %input,
            output_dir = %output_dir.display(),
            "Encoding started"
        );

        let _ = self.events.send(TaskEvent::Started {
            key: key.clone(),
            task_id,
            pid,
        });

        self.tracker.spawn(watcher::watch(
            Arc::clone(self),
            key.clone(),
            task_id,
            process,
            cancel,
        ));

        if running {
            self.tracker.spawn(monitor::run(
                Arc::clone(self),
                key.clone(),
                task_id,
                output_dir,
            ));
        } else {
            // Stopped while pending; the watcher sees the cancelled token.
            // Our set_active may have landed after the stop's set_inactive.
            tracing::info!(stream = %key, task_id, "Stream stopped while starting");
            if !self.active.contains(key).await {
                self.write_status(key, StreamStatus::Inactive).await;
            }
        }

        Ok(())
    }

    /// Stop encoding `key`
    ///
    /// Never fails and never waits for the process: teardown and storage
    /// cleanup happen in the task's watcher. The registry is marked inactive
    /// even when no task exists.
    pub async fn stop_encoding(&self, key: &StreamKey) {
        match self.active.take(key).await {
            Some(slot) => {
                tracing::info!(stream = %key, task_id = slot.id, "Stopping encoding");
            }
            None => {
                tracing::info!(stream = %key, "No running task for stream");
            }
        }

        self.write_status(key, StreamStatus::Inactive).await;
    }

    /// Dispatch a normalized ingest event
    pub async fn handle_event(self: &Arc<Self>, event: &StreamEvent) -> Result<()> {
        let key = StreamKey::parse(event.stream_key.as_str())?;

        tracing::debug!(
            stream = %key,
            action = %event.action,
            timestamp = %event.timestamp,
            "Stream event"
        );

        match event.action {
            StreamAction::Publish => self.start_encoding(&key).await,
            StreamAction::Unpublish => {
                self.stop_encoding(&key).await;
                Ok(())
            }
            StreamAction::Unknown => {
                tracing::warn!(stream = %key, "Ignoring unknown stream action");
                Ok(())
            }
        }
    }

    /// Streams the registry reports as active
    pub async fn get_active_streams(&self) -> Result<Vec<StreamRecord>> {
        Ok(self.registry.list_active().await?)
    }

    /// Registry-wide status counts
    pub async fn get_stats(&self) -> Result<StatsSnapshot> {
        Ok(self.registry.stats().await?)
    }

    /// Number of tasks in the active-set, including finishing ones
    pub async fn active_count(&self) -> usize {
        self.active.len().await
    }

    /// Snapshot of every task in the active-set
    pub async fn active_tasks(&self) -> Vec<TaskInfo> {
        self.active.snapshot().await
    }

    /// Subscribe to task lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<TaskEvent> {
        self.events.subscribe()
    }

    /// Process-local counters
    pub fn counters(&self) -> &EncoderCounters {
        &self.counters
    }

    /// Stop every stream and wait for all watchers and monitors to finish
    pub async fn shutdown(&self) {
        let keys = self.active.live_keys().await;
        tracing::info!(streams = keys.len(), "Shutting down encoder");

        for key in &keys {
            self.stop_encoding(key).await;
        }

        self.tracker.close();
        self.tracker.wait().await;

        tracing::info!("Encoder shut down");
    }

    async fn abort_start(
        &self,
        key: &StreamKey,
        task_id: TaskId,
        stage: StartStage,
        source: std::io::Error,
    ) -> Error {
        self.counters.record_spawn_failure();
        tracing::error!(stream = %key, task_id, stage = %stage, error = %source, "Failed to start encoding");

        // A stop may have removed the slot before our set_active landed;
        // only a newer task on the key keeps the registry active
        let retired = self.active.retire(key, task_id).await.is_some();
        if retired || !self.active.contains(key).await {
            self.write_status(key, StreamStatus::Inactive).await;
        }

        Error::StartFailure {
            key: key.clone(),
            stage,
            source,
        }
    }

    async fn write_status(&self, key: &StreamKey, status: StreamStatus) {
        let result = match status {
            StreamStatus::Active => self.registry.set_active(key).await,
            StreamStatus::Inactive => self.registry.set_inactive(key).await,
            StreamStatus::Error => self.registry.set_error(key).await,
        };

        if let Err(e) = result {
            let err = Error::from(e);
            tracing::error!(stream = %key, status = %status, error = %err, "Failed to update stream status");
        }
    }

    async fn cleanup_storage(&self, key: &StreamKey) {
        let Some(publisher) = self.publisher.as_deref() else {
            return;
        };

        let prefix = self.config.remote.stream_prefix(key);
        match publisher.delete_prefix(&prefix).await {
            Ok(deleted) => {
                tracing::info!(stream = %key, prefix = %prefix, deleted, "Removed stream files from storage");
            }
            Err(e) => {
                tracing::warn!(stream = %key, prefix = %prefix, error = %e, "Failed to remove stream files from storage");
            }
        }
    }
}
