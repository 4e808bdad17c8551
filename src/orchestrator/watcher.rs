//! Completion watcher
//!
//! Waits for a task's process to exit, either on its own or after the task's
//! cancellation token fires, and then finalizes the task: registry status,
//! storage cleanup, active-set retirement and the `Retired` event.
//!
//! A naturally exiting task leaves the active-set before any finalization
//! I/O, so a restart on the same key is never turned away while the old task
//! writes its status or cleans up storage. Each of those steps first checks
//! that no newer task has taken the key and is skipped when one has. A
//! cancelled task was already removed by `stop_encoding`; its watcher only
//! cleans up storage, under the same check.

use std::io;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::task::{TaskEvent, TaskId, TaskOutcome};
use super::Orchestrator;
use crate::engine::{EngineProcess, ExitReport};
use crate::error::Error;
use crate::registry::{StreamKey, StreamStatus};

enum Wake {
    Exited(io::Result<ExitReport>),
    Cancelled,
}

pub(super) async fn watch(
    orchestrator: Arc<Orchestrator>,
    key: StreamKey,
    task_id: TaskId,
    mut process: Box<dyn EngineProcess>,
    cancel: CancellationToken,
) {
    let wake = tokio::select! {
        result = process.wait() => Wake::Exited(result),
        _ = cancel.cancelled() => Wake::Cancelled,
    };

    let exit = match wake {
        Wake::Exited(result) => result,
        Wake::Cancelled => {
            tracing::debug!(stream = %key, task_id, pid = ?process.id(), "Killing transcoder");
            if let Err(e) = process.start_kill() {
                tracing::warn!(stream = %key, task_id, error = %e, "Failed to kill transcoder");
            }
            process.wait().await
        }
    };
    drop(process);

    let mut outcome = TaskOutcome::classify(&exit, cancel.is_cancelled());

    // Claim the slot for finalization; losing it means a stop got there first
    if outcome != TaskOutcome::Cancelled
        && orchestrator.active.retire(&key, task_id).await.is_none()
    {
        outcome = TaskOutcome::Cancelled;
    }

    match outcome {
        TaskOutcome::Completed => {
            tracing::info!(stream = %key, task_id, "Encoding finished");
            orchestrator.counters.record_completed();
            finalize(&orchestrator, &key, task_id, Some(StreamStatus::Inactive)).await;
        }
        TaskOutcome::Crashed { .. } => {
            match &exit {
                Ok(report) => {
                    let err = Error::ProcessFailure {
                        key: key.clone(),
                        exit: *report,
                    };
                    tracing::error!(stream = %key, task_id, error = %err, "Encoding failed");
                }
                Err(e) => {
                    tracing::error!(stream = %key, task_id, error = %e, "Failed to wait for transcoder");
                }
            }
            orchestrator.counters.record_crashed();
            finalize(&orchestrator, &key, task_id, Some(StreamStatus::Error)).await;
        }
        TaskOutcome::Cancelled => {
            tracing::info!(stream = %key, task_id, "Encoding stopped");
            orchestrator.counters.record_cancelled();
            finalize(&orchestrator, &key, task_id, None).await;
        }
    }

    let _ = orchestrator.events.send(TaskEvent::Retired {
        key,
        task_id,
        outcome,
    });
}

/// Write `status` and clean up remote storage for a task that left the
/// active-set, skipping each step once a newer task owns the key
async fn finalize(
    orchestrator: &Orchestrator,
    key: &StreamKey,
    task_id: TaskId,
    status: Option<StreamStatus>,
) {
    if let Some(status) = status {
        if orchestrator.active.contains(key).await {
            tracing::debug!(stream = %key, task_id, "Newer task owns stream, skipping status write");
            return;
        }
        orchestrator.write_status(key, status).await;
    }

    if orchestrator.active.contains(key).await {
        tracing::debug!(stream = %key, task_id, "Newer task owns stream, skipping cleanup");
        return;
    }
    orchestrator.cleanup_storage(key).await;
}
