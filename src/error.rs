//! Crate error types

use std::path::PathBuf;

use thiserror::Error;

use crate::engine::ExitReport;
use crate::event::EventError;
use crate::registry::{InvalidStreamKey, RegistryError, StreamKey};
use crate::storage::StorageError;

/// Step of `start_encoding` that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartStage {
    /// Creating the task's output directory
    OutputDirectory,
    /// Spawning the transcoder
    Spawn,
}

impl std::fmt::Display for StartStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StartStage::OutputDirectory => f.write_str("output directory creation"),
            StartStage::Spawn => f.write_str("transcoder spawn"),
        }
    }
}

/// Error type for orchestrator operations
#[derive(Debug, Error)]
pub enum Error {
    /// Encoding could not be started; no task was registered
    #[error("failed to start encoding for {key}: {stage} failed")]
    StartFailure {
        key: StreamKey,
        stage: StartStage,
        #[source]
        source: std::io::Error,
    },

    /// One artifact could not be published
    #[error("failed to upload {}: {source}", path.display())]
    UploadFailure {
        path: PathBuf,
        #[source]
        source: StorageError,
    },

    /// The transcoder exited unsuccessfully
    #[error("transcoder for {key} failed with {exit}")]
    ProcessFailure { key: StreamKey, exit: ExitReport },

    /// A registry write or read failed
    #[error("registry operation failed: {0}")]
    RegistryWriteFailure(#[from] RegistryError),

    /// An inbound event named an unusable stream key
    #[error("invalid stream key: {0}")]
    InvalidKey(#[from] InvalidStreamKey),

    /// An inbound event could not be decoded
    #[error("invalid event: {0}")]
    InvalidEvent(#[from] EventError),
}

/// Result type alias using the crate error type
pub type Result<T> = std::result::Result<T, Error>;
