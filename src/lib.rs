//! stream-encoder: per-stream HLS encoding orchestrator
//!
//! Turns live ingest sessions into HLS output. When a publisher starts a
//! stream, the [`Orchestrator`] spawns one transcoder for its key, publishes
//! the manifest and segments the transcoder writes, and records the stream's
//! status in a [`StreamRegistry`]. When the publisher leaves or the transcoder
//! exits, it tears everything down and cleans up remote storage.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use stream_encoder::{
//!     EncoderConfig, FfmpegEngine, MemoryPublisher, MemoryRegistry, Orchestrator, StreamKey,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let orchestrator = Arc::new(
//!         Orchestrator::new(
//!             EncoderConfig::default(),
//!             Arc::new(FfmpegEngine::default()),
//!             Arc::new(MemoryRegistry::new()),
//!         )
//!         .with_publisher(Arc::new(MemoryPublisher::new())),
//!     );
//!
//!     let key = StreamKey::parse("my_stream")?;
//!     orchestrator.start_encoding(&key).await?;
//!
//!     // ... later, when the publisher disconnects
//!     orchestrator.stop_encoding(&key).await;
//!     orchestrator.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - `postgres`: [`registry::PgStreamRegistry`], a registry backed by PostgreSQL
//! - `oss`: [`storage::OssPublisher`], S3-compatible object storage

pub mod engine;
pub mod error;
pub mod event;
pub mod orchestrator;
pub mod registry;
pub mod stats;
pub mod storage;

#[cfg(test)]
pub(crate) mod testing;

pub use engine::{EngineProcess, ExitReport, FfmpegConfig, FfmpegEngine, OutputLayout, TranscodingEngine};
pub use error::{Error, Result, StartStage};
pub use event::{EventError, StreamAction, StreamEvent};
pub use orchestrator::{EncoderConfig, Orchestrator, TaskEvent, TaskInfo, TaskOutcome, TaskPhase};
pub use registry::{MemoryRegistry, StreamKey, StreamRecord, StreamRegistry, StreamStatus};
pub use stats::{EncoderCounters, StatsSnapshot};
pub use storage::{MemoryPublisher, RemoteLayout, SegmentPublisher, StorageError};
