//! Stream status records
//!
//! The durable view of a stream, independent of whether an encoding task is
//! currently running for it.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::RegistryError;
use super::key::StreamKey;

/// Lifecycle status of a stream as recorded in the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamStatus {
    /// Not being encoded
    Inactive,
    /// Encoding task started
    Active,
    /// Transcoder exited with a failure
    Error,
}

impl StreamStatus {
    /// Name used in storage and JSON
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamStatus::Inactive => "inactive",
            StreamStatus::Active => "active",
            StreamStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for StreamStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StreamStatus {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inactive" => Ok(StreamStatus::Inactive),
            "active" => Ok(StreamStatus::Active),
            "error" => Ok(StreamStatus::Error),
            other => Err(RegistryError::InvalidRecord(format!(
                "unknown stream status {other:?}"
            ))),
        }
    }
}

/// One registry row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamRecord {
    pub id: i64,
    pub stream_key: StreamKey,
    pub status: StreamStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub stopped_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StreamRecord {
    /// Create a fresh inactive record
    pub fn new(id: i64, stream_key: StreamKey) -> Self {
        let now = Utc::now();
        Self {
            id,
            stream_key,
            status: StreamStatus::Inactive,
            started_at: None,
            stopped_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a status transition, stamping the matching timestamps
    pub fn transition(&mut self, status: StreamStatus) {
        let now = Utc::now();
        match status {
            StreamStatus::Active => self.started_at = Some(now),
            StreamStatus::Inactive | StreamStatus::Error => self.stopped_at = Some(now),
        }
        self.status = status;
        self.updated_at = now;
    }
}
