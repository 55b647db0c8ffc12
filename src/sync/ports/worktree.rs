//! Port for the isolated checkouts that back in-flight tasks.

use crate::task::domain::{ProjectId, TaskId};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for worktree operations.
pub type WorktreeResult<T> = Result<T, WorktreeError>;

/// An on-disk checkout dedicated to one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Worktree {
    /// Task the checkout belongs to.
    pub task_id: TaskId,
    /// Checkout location.
    pub path: String,
    /// Branch checked out in the worktree.
    pub branch: String,
}

/// Worktree lookup and removal contract.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WorktreeManager: Send + Sync {
    /// Finds the worktree for a task, if one exists.
    async fn find_by_task_id(&self, task_id: TaskId) -> WorktreeResult<Option<Worktree>>;

    /// Removes the worktree for a task.
    async fn cleanup(&self, task_id: TaskId, project_id: ProjectId) -> WorktreeResult<()>;
}

/// Errors returned by worktree adapters.
#[derive(Debug, Clone, Error)]
pub enum WorktreeError {
    /// Removing the checkout failed.
    #[error("worktree cleanup failed for task {task_id}: {cause}")]
    Cleanup {
        /// Task whose worktree could not be removed.
        task_id: TaskId,
        /// Underlying failure.
        cause: Arc<dyn std::error::Error + Send + Sync>,
    },

    /// Lookup failed.
    #[error("worktree lookup failed: {0}")]
    Lookup(Arc<dyn std::error::Error + Send + Sync>),
}

impl WorktreeError {
    /// Wraps a cleanup failure.
    pub fn cleanup(task_id: TaskId, err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Cleanup {
            task_id,
            cause: Arc::new(err),
        }
    }

    /// Wraps a lookup failure.
    pub fn lookup(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Lookup(Arc::new(err))
    }
}
