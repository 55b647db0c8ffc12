//! Pull request aggregate root.

use super::{
    PullRequestDomainError, PullRequestId, PullRequestNumber, PullRequestStatus,
    RemotePullRequest, RepositoryFullName,
};
use crate::task::domain::TaskId;
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Merge details recorded once a pull request is merged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeMetadata {
    /// Merge commit SHA.
    pub commit_sha: Option<String>,
    /// Merge timestamp.
    pub merged_at: Option<DateTime<Utc>>,
    /// Login of the merging user.
    pub merged_by: Option<String>,
}

/// Parameter object for registering a freshly opened pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPullRequest {
    /// Owning task.
    pub task_id: TaskId,
    /// Repository slug.
    pub repository: RepositoryFullName,
    /// Remote pull request number.
    pub number: PullRequestNumber,
    /// Head branch name.
    pub head_branch: String,
    /// Base branch name.
    pub base_branch: String,
}

/// Pull request aggregate root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    id: PullRequestId,
    task_id: TaskId,
    repository: RepositoryFullName,
    number: PullRequestNumber,
    status: PullRequestStatus,
    head_branch: String,
    base_branch: String,
    merge: MergeMetadata,
    closed_at: Option<DateTime<Utc>>,
    mergeable: Option<bool>,
    mergeable_state: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PullRequest {
    /// Registers a newly opened pull request.
    ///
    /// # Errors
    ///
    /// Returns [`PullRequestDomainError::EmptyBranchName`] when either branch
    /// name is blank.
    pub fn new(params: NewPullRequest, clock: &impl Clock) -> Result<Self, PullRequestDomainError> {
        let head_branch = non_empty_branch(&params.head_branch)?;
        let base_branch = non_empty_branch(&params.base_branch)?;
        let timestamp = clock.utc();
        Ok(Self {
            id: PullRequestId::new(),
            task_id: params.task_id,
            repository: params.repository,
            number: params.number,
            status: PullRequestStatus::Open,
            head_branch,
            base_branch,
            merge: MergeMetadata::default(),
            closed_at: None,
            mergeable: None,
            mergeable_state: None,
            created_at: timestamp,
            updated_at: timestamp,
        })
    }

    /// Returns a copy of this pull request placed in `status` without
    /// transition validation.
    #[must_use]
    pub fn with_status(mut self, status: PullRequestStatus) -> Self {
        self.status = status;
        self
    }

    /// Returns the internal identifier.
    #[must_use]
    pub const fn id(&self) -> PullRequestId {
        self.id
    }

    /// Returns the owning task.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Returns the repository slug.
    #[must_use]
    pub const fn repository(&self) -> &RepositoryFullName {
        &self.repository
    }

    /// Returns the remote pull request number.
    #[must_use]
    pub const fn number(&self) -> PullRequestNumber {
        self.number
    }

    /// Returns the tracked status.
    #[must_use]
    pub const fn status(&self) -> PullRequestStatus {
        self.status
    }

    /// Returns the head branch name.
    #[must_use]
    pub fn head_branch(&self) -> &str {
        &self.head_branch
    }

    /// Returns the base branch name.
    #[must_use]
    pub fn base_branch(&self) -> &str {
        &self.base_branch
    }

    /// Returns merge details.
    #[must_use]
    pub const fn merge(&self) -> &MergeMetadata {
        &self.merge
    }

    /// Returns the close timestamp.
    #[must_use]
    pub const fn closed_at(&self) -> Option<DateTime<Utc>> {
        self.closed_at
    }

    /// Returns the mergeability flag.
    #[must_use]
    pub const fn mergeable(&self) -> Option<bool> {
        self.mergeable
    }

    /// Returns the service-specific mergeable state.
    #[must_use]
    pub fn mergeable_state(&self) -> Option<&str> {
        self.mergeable_state.as_deref()
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest change timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Moves the pull request to `status`.
    ///
    /// # Errors
    ///
    /// Returns [`PullRequestDomainError::InvalidStatusTransition`] unless the
    /// move is from `Open` to a terminal status.
    pub fn transition_to(
        &mut self,
        status: PullRequestStatus,
        at: DateTime<Utc>,
    ) -> Result<(), PullRequestDomainError> {
        if !self.status.can_transition_to(status) {
            return Err(PullRequestDomainError::InvalidStatusTransition {
                from: self.status,
                to: status,
            });
        }
        self.status = status;
        self.updated_at = at;
        Ok(())
    }

    /// Copies non-status details from a remote snapshot.
    ///
    /// Merge details are only taken while the tracked status is `Merged`, and
    /// the close timestamp only while the status is terminal. Returns `true`
    /// when any field changed.
    pub fn refresh_details(&mut self, remote: &RemotePullRequest, at: DateTime<Utc>) -> bool {
        let mut changed = false;

        if !remote.head_branch.trim().is_empty() {
            changed |= replace_if_different(&mut self.head_branch, remote.head_branch.clone());
        }
        if !remote.base_branch.trim().is_empty() {
            changed |= replace_if_different(&mut self.base_branch, remote.base_branch.clone());
        }
        if self.status == PullRequestStatus::Merged {
            let merge = MergeMetadata {
                commit_sha: remote.merge_commit_sha.clone(),
                merged_at: remote.merged_at,
                merged_by: remote.merged_by.clone(),
            };
            changed |= replace_if_different(&mut self.merge, merge);
        }
        if self.status.is_terminal() && remote.closed_at.is_some() {
            changed |= replace_if_different(&mut self.closed_at, remote.closed_at);
        }
        changed |= replace_if_different(&mut self.mergeable, remote.mergeable);
        changed |= replace_if_different(&mut self.mergeable_state, remote.mergeable_state.clone());

        if changed {
            self.updated_at = at;
        }
        changed
    }
}

fn non_empty_branch(name: &str) -> Result<String, PullRequestDomainError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(PullRequestDomainError::EmptyBranchName);
    }
    Ok(trimmed.to_owned())
}

fn replace_if_different<T: PartialEq>(field: &mut T, value: T) -> bool {
    if *field == value {
        return false;
    }
    *field = value;
    true
}
