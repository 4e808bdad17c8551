//! Active-set of encoding tasks
//!
//! Maps each stream key to the one live task that owns it. A slot only ever
//! holds a pending or running task: it is removed before any finalization
//! I/O starts. All membership changes happen under a single write lock; no
//! I/O is ever performed while it is held.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use super::task::{TaskId, TaskPhase};
use crate::registry::StreamKey;

/// Bookkeeping for one task
pub(crate) struct TaskSlot {
    pub id: TaskId,
    pub phase: TaskPhase,
    pub cancel: CancellationToken,
    pub output_dir: PathBuf,
    pub created_at: Instant,
}

impl TaskSlot {
    pub fn pending(id: TaskId, cancel: CancellationToken, output_dir: PathBuf) -> Self {
        Self {
            id,
            phase: TaskPhase::Pending,
            cancel,
            output_dir,
            created_at: Instant::now(),
        }
    }
}

/// Read-only view of a task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskInfo {
    pub key: StreamKey,
    pub task_id: TaskId,
    pub phase: TaskPhase,
    pub output_dir: PathBuf,
    pub age: Duration,
}

/// Result of trying to reserve a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Reservation {
    /// The key was free and now belongs to the new task
    Reserved,
    /// A live task already owns the key
    Occupied(TaskId),
}

/// Key to task map
#[derive(Default)]
pub(crate) struct ActiveSet {
    tasks: RwLock<HashMap<StreamKey, TaskSlot>>,
}

impl ActiveSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `slot` for `key` unless the key is taken
    pub async fn reserve(&self, key: &StreamKey, slot: TaskSlot) -> Reservation {
        let mut tasks = self.tasks.write().await;

        if let Some(existing) = tasks.get(key) {
            return Reservation::Occupied(existing.id);
        }

        tasks.insert(key.clone(), slot);
        Reservation::Reserved
    }

    /// Move task `id` to a live `phase` if it still owns `key`
    ///
    /// Returns false when the slot is gone or belongs to another task, or
    /// when the transition is not allowed. Terminal phases are reached by
    /// leaving the set through [`take`](Self::take) or
    /// [`retire`](Self::retire).
    pub async fn advance(&self, key: &StreamKey, id: TaskId, phase: TaskPhase) -> bool {
        let mut tasks = self.tasks.write().await;

        match tasks.get_mut(key) {
            Some(slot)
                if slot.id == id && phase.is_live() && slot.phase.can_transition_to(phase) =>
            {
                slot.phase = phase;
                true
            }
            _ => false,
        }
    }

    /// Cancel and remove the task owning `key`
    pub async fn take(&self, key: &StreamKey) -> Option<TaskSlot> {
        let mut slot = self.tasks.write().await.remove(key)?;
        slot.cancel.cancel();
        slot.phase = TaskPhase::Cancelled;
        Some(slot)
    }

    /// Remove task `id` from `key` if it is still there
    ///
    /// Whoever gets the slot back owns the task's finalization.
    pub async fn retire(&self, key: &StreamKey, id: TaskId) -> Option<TaskSlot> {
        let mut tasks = self.tasks.write().await;

        if tasks.get(key).is_some_and(|slot| slot.id == id) {
            tasks.remove(key)
        } else {
            None
        }
    }

    /// Whether task `id` still owns `key`
    pub async fn holds(&self, key: &StreamKey, id: TaskId) -> bool {
        self.tasks
            .read()
            .await
            .get(key)
            .is_some_and(|slot| slot.id == id)
    }

    /// Whether any task owns `key`
    pub async fn contains(&self, key: &StreamKey) -> bool {
        self.tasks.read().await.contains_key(key)
    }

    pub async fn len(&self) -> usize {
        self.tasks.read().await.len()
    }

    /// Keys of every task
    pub async fn live_keys(&self) -> Vec<StreamKey> {
        self.tasks.read().await.keys().cloned().collect()
    }

    /// Snapshot of every task, ordered by key
    pub async fn snapshot(&self) -> Vec<TaskInfo> {
        let tasks = self.tasks.read().await;
        let mut infos: Vec<TaskInfo> = tasks
            .iter()
            .map(|(key, slot)| TaskInfo {
                key: key.clone(),
                task_id: slot.id,
                phase: slot.phase,
                output_dir: slot.output_dir.clone(),
                age: slot.created_at.elapsed(),
            })
            .collect();
        infos.sort_by(|a, b| a.key.cmp(&b.key));
        infos
    }
}
