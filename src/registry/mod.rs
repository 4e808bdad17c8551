//! Durable stream status registry
//!
//! The registry is the source of truth for reporting: it records whether each
//! stream is inactive, active or in error, and survives the encoding task that
//! drove it there.
//!
//! ```text
//!   start_encoding ──► set_active ────┐
//!                                     ▼
//!   stop_encoding ───► set_inactive ──► StreamRecord ◄── list_active / stats
//!                                     ▲
//!   watcher (crash) ─► set_error ─────┘
//! ```
//!
//! Every setter upserts: writing a status for an unknown key creates its row.

pub mod error;
pub mod key;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod status;
pub mod store;

use async_trait::async_trait;

pub use error::RegistryError;
pub use key::{InvalidStreamKey, StreamKey};
#[cfg(feature = "postgres")]
pub use postgres::PgStreamRegistry;
pub use status::{StreamRecord, StreamStatus};
pub use store::MemoryRegistry;

use crate::stats::StatsSnapshot;

/// Durable store of per-stream status
#[async_trait]
pub trait StreamRegistry: Send + Sync {
    /// Return the row for `key`, creating an inactive one if absent
    async fn create_if_absent(&self, key: &StreamKey) -> Result<StreamRecord, RegistryError>;

    /// Mark the stream active and stamp `started_at`
    async fn set_active(&self, key: &StreamKey) -> Result<(), RegistryError>;

    /// Mark the stream inactive and stamp `stopped_at`
    async fn set_inactive(&self, key: &StreamKey) -> Result<(), RegistryError>;

    /// Mark the stream as failed and stamp `stopped_at`
    async fn set_error(&self, key: &StreamKey) -> Result<(), RegistryError>;

    /// Look up a single stream
    async fn get(&self, key: &StreamKey) -> Result<Option<StreamRecord>, RegistryError>;

    /// All active streams, most recently updated first
    async fn list_active(&self) -> Result<Vec<StreamRecord>, RegistryError>;

    /// Aggregate status counts
    async fn stats(&self) -> Result<StatsSnapshot, RegistryError>;
}
