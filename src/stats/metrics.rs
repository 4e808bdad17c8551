//! Statistics for encoding streams

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Registry-wide status counts, derived on demand
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Streams ever registered
    pub total_streams: u64,
    /// Streams currently marked active
    pub active_streams: u64,
    /// Streams marked inactive
    pub inactive_streams: u64,
    /// Streams whose transcoder crashed
    pub error_streams: u64,
}

/// Process-local counters maintained by the orchestrator
#[derive(Debug, Default)]
pub struct EncoderCounters {
    spawned: AtomicU64,
    spawn_failures: AtomicU64,
    completed: AtomicU64,
    crashed: AtomicU64,
    cancelled: AtomicU64,
    upload_passes: AtomicU64,
    upload_failures: AtomicU64,
}

/// Point-in-time copy of [`EncoderCounters`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CounterSnapshot {
    /// Transcoder processes spawned
    pub spawned: u64,
    /// Starts that failed before a process existed
    pub spawn_failures: u64,
    /// Tasks whose process exited successfully
    pub completed: u64,
    /// Tasks whose process exited with a failure
    pub crashed: u64,
    /// Tasks ended by a stop request
    pub cancelled: u64,
    /// Upload passes over an output directory
    pub upload_passes: u64,
    /// Individual artifact uploads that failed
    pub upload_failures: u64,
}

impl EncoderCounters {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_spawn(&self) {
        self.spawned.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_spawn_failure(&self) {
        self.spawn_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_crashed(&self) {
        self.crashed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_cancelled(&self) {
        self.cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_upload_pass(&self, failures: u64) {
        self.upload_passes.fetch_add(1, Ordering::Relaxed);
        self.upload_failures.fetch_add(failures, Ordering::Relaxed);
    }

    /// Take a snapshot of all counters
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            spawned: self.spawned.load(Ordering::Relaxed),
            spawn_failures: self.spawn_failures.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            crashed: self.crashed.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            upload_passes: self.upload_passes.load(Ordering::Relaxed),
            upload_failures: self.upload_failures.load(Ordering::Relaxed),
        }
    }
}
