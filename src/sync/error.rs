//! Error types shared by the monitor, the worker, and effect execution.

use crate::pull_request::{
    domain::PullRequestId,
    ports::{PullRequestRepositoryError, RemoteClientError},
};
use crate::task::{domain::TaskId, ports::TaskRepositoryError};
use std::time::Duration;
use thiserror::Error;

/// Failure while synchronizing a single pull request.
#[derive(Debug, Clone, Error)]
pub enum PullRequestSyncError {
    /// The remote service could not provide the pull request.
    #[error(transparent)]
    Remote(#[from] RemoteClientError),

    /// Pull request persistence failed.
    #[error(transparent)]
    PullRequestRepository(#[from] PullRequestRepositoryError),

    /// Task persistence failed.
    #[error(transparent)]
    TaskRepository(#[from] TaskRepositoryError),

    /// The task owning the pull request does not exist.
    #[error("task {0} owning the pull request was not found")]
    TaskNotFound(TaskId),

    /// The pull request record disappeared.
    #[error("pull request {0} was not found")]
    PullRequestNotFound(PullRequestId),

    /// A persistence call exceeded its deadline.
    #[error("persistence call timed out after {0:?}")]
    Timeout(Duration),

    /// Shutdown was requested before the sync finished.
    #[error("sync cancelled")]
    Cancelled,
}

impl PullRequestSyncError {
    /// Returns `true` when a later attempt may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Remote(err) => err.is_retryable(),
            Self::Timeout(_) => true,
            _ => false,
        }
    }
}

/// Result type for single pull request synchronization.
pub type PullRequestSyncResult<T> = Result<T, PullRequestSyncError>;
