//! Registry error types

use thiserror::Error;

/// Error type for registry operations
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Backend database failure
    #[cfg(feature = "postgres")]
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored row could not be decoded
    #[error("invalid stream record: {0}")]
    InvalidRecord(String),

    /// Backend refused or could not serve the request
    #[error("registry unavailable: {0}")]
    Unavailable(String),
}
