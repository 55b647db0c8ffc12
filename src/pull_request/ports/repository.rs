//! Repository port for pull request persistence and monitoring queries.

use crate::pull_request::domain::{PullRequest, PullRequestId, PullRequestStatus};
use crate::task::domain::TaskId;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for pull request repository operations.
pub type PullRequestRepositoryResult<T> = Result<T, PullRequestRepositoryError>;

/// Pull request persistence contract.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PullRequestRepository: Send + Sync {
    /// Stores a newly tracked pull request.
    ///
    /// # Errors
    ///
    /// Returns [`PullRequestRepositoryError::DuplicatePullRequest`] when the
    /// identifier is already stored.
    async fn store(&self, pull_request: &PullRequest) -> PullRequestRepositoryResult<()>;

    /// Finds a pull request by internal identifier.
    async fn find_by_id(&self, id: PullRequestId)
    -> PullRequestRepositoryResult<Option<PullRequest>>;

    /// Finds the pull request owned by a task.
    async fn find_by_task_id(
        &self,
        task_id: TaskId,
    ) -> PullRequestRepositoryResult<Option<PullRequest>>;

    /// Overwrites every mutable field of a stored pull request.
    ///
    /// # Errors
    ///
    /// Returns [`PullRequestRepositoryError::NotFound`] when the pull request
    /// does not exist.
    async fn update(&self, pull_request: &PullRequest) -> PullRequestRepositoryResult<()>;

    /// Overwrites a stored pull request only while its stored status still
    /// equals `expected`.
    ///
    /// Returns `false` without writing when another writer changed the
    /// status first.
    ///
    /// # Errors
    ///
    /// Returns [`PullRequestRepositoryError::NotFound`] when the pull request
    /// does not exist.
    async fn update_if_status(
        &self,
        pull_request: &PullRequest,
        expected: PullRequestStatus,
    ) -> PullRequestRepositoryResult<bool>;

    /// Lists pull requests whose remote state is still being tracked.
    async fn list_actively_monitored(&self) -> PullRequestRepositoryResult<Vec<PullRequest>>;
}

/// Errors returned by pull request repository implementations.
#[derive(Debug, Clone, Error)]
pub enum PullRequestRepositoryError {
    /// A pull request with the same identifier already exists.
    #[error("duplicate pull request identifier: {0}")]
    DuplicatePullRequest(PullRequestId),

    /// The pull request was not found.
    #[error("pull request not found: {0}")]
    NotFound(PullRequestId),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl PullRequestRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
