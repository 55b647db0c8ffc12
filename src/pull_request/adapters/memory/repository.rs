//! In-memory repository for tracked pull requests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::pull_request::{
    domain::{PullRequest, PullRequestId, PullRequestStatus},
    ports::{PullRequestRepository, PullRequestRepositoryError, PullRequestRepositoryResult},
};
use crate::task::domain::TaskId;

/// Thread-safe in-memory pull request repository.
///
/// Open pull requests are reported as actively monitored.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPullRequestRepository {
    state: Arc<RwLock<InMemoryPullRequestState>>,
}

#[derive(Debug, Default)]
struct InMemoryPullRequestState {
    pull_requests: HashMap<PullRequestId, PullRequest>,
    task_index: HashMap<TaskId, PullRequestId>,
    fail_listing: bool,
}

impl InMemoryPullRequestRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent [`PullRequestRepository::list_actively_monitored`]
    /// calls fail with a persistence error while `fail` is `true`.
    ///
    /// # Errors
    ///
    /// Returns a persistence error when lock acquisition fails.
    pub fn set_listing_failure(&self, fail: bool) -> PullRequestRepositoryResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        state.fail_listing = fail;
        Ok(())
    }
}

fn lock_error(err: impl std::fmt::Display) -> PullRequestRepositoryError {
    PullRequestRepositoryError::persistence(std::io::Error::other(err.to_string()))
}

fn replace_existing(
    state: &mut InMemoryPullRequestState,
    pull_request: &PullRequest,
) -> PullRequestRepositoryResult<()> {
    let slot = state
        .pull_requests
        .get_mut(&pull_request.id())
        .ok_or(PullRequestRepositoryError::NotFound(pull_request.id()))?;
    *slot = pull_request.clone();
    state
        .task_index
        .insert(pull_request.task_id(), pull_request.id());
    Ok(())
}

#[async_trait]
impl PullRequestRepository for InMemoryPullRequestRepository {
    async fn store(&self, pull_request: &PullRequest) -> PullRequestRepositoryResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        if state.pull_requests.contains_key(&pull_request.id()) {
            return Err(PullRequestRepositoryError::DuplicatePullRequest(
                pull_request.id(),
            ));
        }
        state
            .task_index
            .insert(pull_request.task_id(), pull_request.id());
        state
            .pull_requests
            .insert(pull_request.id(), pull_request.clone());
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: PullRequestId,
    ) -> PullRequestRepositoryResult<Option<PullRequest>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state.pull_requests.get(&id).cloned())
    }

    async fn find_by_task_id(
        &self,
        task_id: TaskId,
    ) -> PullRequestRepositoryResult<Option<PullRequest>> {
        let state = self.state.read().map_err(lock_error)?;
        Ok(state
            .task_index
            .get(&task_id)
            .and_then(|id| state.pull_requests.get(id))
            .cloned())
    }

    async fn update(&self, pull_request: &PullRequest) -> PullRequestRepositoryResult<()> {
        let mut state = self.state.write().map_err(lock_error)?;
        replace_existing(&mut state, pull_request)
    }

    async fn update_if_status(
        &self,
        pull_request: &PullRequest,
        expected: PullRequestStatus,
    ) -> PullRequestRepositoryResult<bool> {
        let mut state = self.state.write().map_err(lock_error)?;
        let stored_status = state
            .pull_requests
            .get(&pull_request.id())
            .map(PullRequest::status)
            .ok_or(PullRequestRepositoryError::NotFound(pull_request.id()))?;
        if stored_status != expected {
            return Ok(false);
        }
        replace_existing(&mut state, pull_request)?;
        Ok(true)
    }

    async fn list_actively_monitored(&self) -> PullRequestRepositoryResult<Vec<PullRequest>> {
        let state = self.state.read().map_err(lock_error)?;
        if state.fail_listing {
            return Err(PullRequestRepositoryError::persistence(
                std::io::Error::other("listing disabled"),
            ));
        }
        let mut open: Vec<PullRequest> = state
            .pull_requests
            .values()
            .filter(|pull_request| pull_request.status() == PullRequestStatus::Open)
            .cloned()
            .collect();
        open.sort_by_key(PullRequest::created_at);
        Ok(open)
    }
}
