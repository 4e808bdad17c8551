//! Storage error types

use thiserror::Error;

/// Error type for publisher operations
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading the local artifact failed
    #[error("local I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Object storage backend error
    #[cfg(feature = "oss")]
    #[error("object storage error: {0}")]
    Backend(#[from] opendal::Error),

    /// Backend rejected the request
    #[error("storage rejected {key}: {reason}")]
    Rejected { key: String, reason: String },

    /// Operation not offered by this backend
    #[error("{0} is not supported by this storage backend")]
    Unsupported(&'static str),
}
