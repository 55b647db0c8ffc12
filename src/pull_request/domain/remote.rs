//! Snapshot of a pull request as reported by the code-hosting service.

use super::{PullRequestNumber, PullRequestStatus, RemotePullRequestState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Point-in-time view of a pull request fetched from the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemotePullRequest {
    /// Pull request number.
    pub number: PullRequestNumber,
    /// Open/closed state.
    pub state: RemotePullRequestState,
    /// Whether the pull request has been merged.
    pub merged: bool,
    /// Head branch name.
    pub head_branch: String,
    /// Base branch name.
    pub base_branch: String,
    /// Merge commit SHA, when merged.
    pub merge_commit_sha: Option<String>,
    /// Merge timestamp, when merged.
    pub merged_at: Option<DateTime<Utc>>,
    /// Login of the merging user, when merged.
    pub merged_by: Option<String>,
    /// Close timestamp, when closed or merged.
    pub closed_at: Option<DateTime<Utc>>,
    /// Mergeability flag; `None` while the service is still computing it.
    pub mergeable: Option<bool>,
    /// Service-specific mergeable state such as `clean` or `dirty`.
    pub mergeable_state: Option<String>,
}

impl RemotePullRequest {
    /// Creates an open, unmerged snapshot with the given branches.
    #[must_use]
    pub fn open(
        number: PullRequestNumber,
        head_branch: impl Into<String>,
        base_branch: impl Into<String>,
    ) -> Self {
        Self {
            number,
            state: RemotePullRequestState::Open,
            merged: false,
            head_branch: head_branch.into(),
            base_branch: base_branch.into(),
            merge_commit_sha: None,
            merged_at: None,
            merged_by: None,
            closed_at: None,
            mergeable: None,
            mergeable_state: None,
        }
    }

    /// Marks the snapshot as merged.
    #[must_use]
    pub fn merged(
        mut self,
        commit_sha: impl Into<String>,
        merged_by: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        self.state = RemotePullRequestState::Closed;
        self.merged = true;
        self.merge_commit_sha = Some(commit_sha.into());
        self.merged_by = Some(merged_by.into());
        self.merged_at = Some(at);
        self.closed_at = Some(at);
        self
    }

    /// Marks the snapshot as closed without a merge.
    #[must_use]
    pub fn closed(mut self, at: DateTime<Utc>) -> Self {
        self.state = RemotePullRequestState::Closed;
        self.merged = false;
        self.closed_at = Some(at);
        self
    }

    /// Sets mergeability information.
    #[must_use]
    pub fn with_mergeable(mut self, mergeable: bool, state: impl Into<String>) -> Self {
        self.mergeable = Some(mergeable);
        self.mergeable_state = Some(state.into());
        self
    }

    /// Returns the local status implied by this snapshot.
    #[must_use]
    pub const fn status(&self) -> PullRequestStatus {
        PullRequestStatus::from_remote(self.state, self.merged)
    }
}
