//! Worktree manager that tracks checkouts and cleanup calls in memory.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::sync::ports::{Worktree, WorktreeError, WorktreeManager, WorktreeResult};
use crate::task::domain::{ProjectId, TaskId};

/// Thread-safe in-memory worktree manager.
#[derive(Debug, Clone, Default)]
pub struct RecordingWorktreeManager {
    state: Arc<Mutex<WorktreeState>>,
}

#[derive(Debug, Default)]
struct WorktreeState {
    worktrees: HashMap<TaskId, Worktree>,
    cleanups: Vec<(TaskId, ProjectId)>,
    failing: bool,
}

impl RecordingWorktreeManager {
    /// Creates a manager with no worktrees.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a worktree for a task.
    pub fn add(&self, worktree: Worktree) {
        self.lock().worktrees.insert(worktree.task_id, worktree);
    }

    /// Makes cleanup fail while `failing` is `true`.
    pub fn set_failing(&self, failing: bool) {
        self.lock().failing = failing;
    }

    /// Returns every cleanup request in call order.
    #[must_use]
    pub fn cleanups(&self) -> Vec<(TaskId, ProjectId)> {
        self.lock().cleanups.clone()
    }

    /// Returns `true` while a worktree exists for the task.
    #[must_use]
    pub fn exists(&self, task_id: TaskId) -> bool {
        self.lock().worktrees.contains_key(&task_id)
    }

    fn lock(&self) -> MutexGuard<'_, WorktreeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl WorktreeManager for RecordingWorktreeManager {
    async fn find_by_task_id(&self, task_id: TaskId) -> WorktreeResult<Option<Worktree>> {
        Ok(self.lock().worktrees.get(&task_id).cloned())
    }

    async fn cleanup(&self, task_id: TaskId, project_id: ProjectId) -> WorktreeResult<()> {
        let mut state = self.lock();
        state.cleanups.push((task_id, project_id));
        if state.failing {
            return Err(WorktreeError::cleanup(
                task_id,
                std::io::Error::other("worktree busy"),
            ));
        }
        state.worktrees.remove(&task_id);
        Ok(())
    }
}
