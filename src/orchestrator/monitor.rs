//! Upload monitor
//!
//! One monitor runs per task. After an initial delay it periodically scans the
//! task's output directory and publishes the manifest followed by every
//! segment. It never receives a stop signal: each tick it checks whether its
//! task still owns the stream key in the active-set and exits when it does
//! not.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::time::{self, MissedTickBehavior};

use super::task::TaskId;
use super::Orchestrator;
use crate::engine::OutputLayout;
use crate::error::Error;
use crate::registry::StreamKey;
use crate::storage::{RemoteLayout, SegmentPublisher, StorageError};

/// Result of one upload pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadReport {
    /// Artifacts uploaded
    pub uploaded: usize,
    /// Artifacts that failed to upload
    pub failed: usize,
    /// Whether the pass stopped early because the manifest failed
    pub aborted: bool,
}

/// Run the monitor loop for task `task_id` until it no longer owns `key`
pub(super) async fn run(
    orchestrator: Arc<Orchestrator>,
    key: StreamKey,
    task_id: TaskId,
    output_dir: PathBuf,
) {
    let config = &orchestrator.config;

    time::sleep(config.upload_initial_delay).await;

    let mut interval = time::interval(config.upload_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;

        if !orchestrator.active.holds(&key, task_id).await {
            break;
        }

        let Some(publisher) = orchestrator.publisher.as_deref() else {
            continue;
        };

        let report =
            upload_pass(publisher, &config.remote, &config.layout, &key, &output_dir).await;
        orchestrator.counters.record_upload_pass(report.failed as u64);

        tracing::trace!(
            stream = %key,
            task_id,
            uploaded = report.uploaded,
            failed = report.failed,
            "Upload pass finished"
        );
    }

    tracing::debug!(stream = %key, task_id, "Upload monitor stopped");
}

/// Publish the manifest, then every segment in `dir`
///
/// A missing manifest means the transcoder has not written anything yet and
/// yields an empty report. If the manifest upload fails the segments are
/// skipped for this pass; segment failures are logged and counted.
pub async fn upload_pass(
    publisher: &dyn SegmentPublisher,
    remote: &RemoteLayout,
    layout: &OutputLayout,
    key: &StreamKey,
    dir: &Path,
) -> UploadReport {
    let mut report = UploadReport::default();

    let manifest = layout.manifest_path(dir);
    match tokio::fs::try_exists(&manifest).await {
        Ok(true) => {}
        Ok(false) => {
            tracing::debug!(stream = %key, "Manifest not written yet");
            return report;
        }
        Err(e) => {
            log_failure(key, manifest, StorageError::Io(e));
            report.failed += 1;
            report.aborted = true;
            return report;
        }
    }

    let manifest_key = remote.object_key(key, &layout.manifest_name);
    if let Err(source) = publisher.upload(&manifest, &manifest_key).await {
        log_failure(key, manifest, source);
        report.failed += 1;
        report.aborted = true;
        return report;
    }
    report.uploaded += 1;

    let segments = match list_segments(layout, dir).await {
        Ok(segments) => segments,
        Err(e) => {
            log_failure(key, dir.to_path_buf(), StorageError::Io(e));
            report.failed += 1;
            return report;
        }
    };

    for name in segments {
        let path = dir.join(&name);
        match publisher.upload(&path, &remote.object_key(key, &name)).await {
            Ok(()) => report.uploaded += 1,
            Err(source) => {
                log_failure(key, path, source);
                report.failed += 1;
            }
        }
    }

    report
}

/// Segment file names in `dir`, sorted
async fn list_segments(layout: &OutputLayout, dir: &Path) -> std::io::Result<Vec<String>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut names = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if layout.is_segment(&name) && entry.file_type().await?.is_file() {
            names.push(name);
        }
    }

    names.sort();
    Ok(names)
}

fn log_failure(key: &StreamKey, path: PathBuf, source: StorageError) {
    let err = Error::UploadFailure { path, source };
    tracing::warn!(stream = %key, error = %err, "Upload failed");
}
