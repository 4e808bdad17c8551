//! Encoding task state machine
//!
//! ```text
//!   Pending ──► Running ──┬──► Completed   (exit 0)
//!      │                  ├──► Crashed     (non-zero exit / wait error)
//!      └──────────────────┴──► Cancelled   (stop requested)
//! ```

use std::io;

use crate::engine::ExitReport;
use crate::registry::StreamKey;

/// Identifier of one task instance, unique for the orchestrator's lifetime
pub type TaskId = u64;

/// Lifecycle phase of an encoding task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskPhase {
    /// Reserved in the active-set, transcoder not yet spawned
    Pending,
    /// Transcoder running, watcher and upload monitor active
    Running,
    /// Transcoder exited successfully
    Completed,
    /// Transcoder exited with a failure
    Crashed,
    /// Stopped on request
    Cancelled,
}

impl TaskPhase {
    /// Whether the task still owns its key
    pub fn is_live(&self) -> bool {
        matches!(self, TaskPhase::Pending | TaskPhase::Running)
    }

    /// Whether the phase is final
    pub fn is_terminal(&self) -> bool {
        !self.is_live()
    }

    /// Whether moving from `self` to `next` is a legal transition
    pub fn can_transition_to(&self, next: TaskPhase) -> bool {
        match (self, next) {
            (TaskPhase::Pending, TaskPhase::Running) => true,
            (TaskPhase::Pending, TaskPhase::Cancelled) => true,
            (TaskPhase::Running, next) => next.is_terminal(),
            _ => false,
        }
    }
}

impl std::fmt::Display for TaskPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TaskPhase::Pending => "pending",
            TaskPhase::Running => "running",
            TaskPhase::Completed => "completed",
            TaskPhase::Crashed => "crashed",
            TaskPhase::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// How a task ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Transcoder exited with success
    Completed,
    /// Transcoder failed; `exit` is `None` when waiting on it failed
    Crashed { exit: Option<ExitReport> },
    /// Stopped on request, whatever the exit looked like
    Cancelled,
}

impl TaskOutcome {
    /// Classify a process exit
    ///
    /// A cancelled task is never reported as crashed: forced termination
    /// usually surfaces as a signal exit.
    pub fn classify(exit: &io::Result<ExitReport>, cancelled: bool) -> Self {
        if cancelled {
            return TaskOutcome::Cancelled;
        }

        match exit {
            Ok(report) if report.success() => TaskOutcome::Completed,
            Ok(report) => TaskOutcome::Crashed {
                exit: Some(*report),
            },
            Err(_) => TaskOutcome::Crashed { exit: None },
        }
    }

    /// Terminal phase matching this outcome
    pub fn phase(&self) -> TaskPhase {
        match self {
            TaskOutcome::Completed => TaskPhase::Completed,
            TaskOutcome::Crashed { .. } => TaskPhase::Crashed,
            TaskOutcome::Cancelled => TaskPhase::Cancelled,
        }
    }
}

/// Lifecycle notifications published by the orchestrator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskEvent {
    /// A transcoder was spawned
    Started {
        key: StreamKey,
        task_id: TaskId,
        pid: Option<u32>,
    },
    /// A task's watcher finished; the task no longer owns its key
    Retired {
        key: StreamKey,
        task_id: TaskId,
        outcome: TaskOutcome,
    },
}

impl TaskEvent {
    /// Stream the event concerns
    pub fn key(&self) -> &StreamKey {
        match self {
            TaskEvent::Started { key, .. } | TaskEvent::Retired { key, .. } => key,
        }
    }

    /// Task the event concerns
    pub fn task_id(&self) -> TaskId {
        match self {
            TaskEvent::Started { task_id, .. } | TaskEvent::Retired { task_id, .. } => *task_id,
        }
    }
}
