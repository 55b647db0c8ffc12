//! Pure mapping from an observed pull request state to task status changes
//! and the side effects they require.
//!
//! Both the real-time monitor and the batch worker call [`reconcile`] and
//! hand the result to [`crate::sync::executor::ReconciliationExecutor`], so
//! the two paths cannot drift apart.

use crate::pull_request::domain::{PullRequest, PullRequestStatus, RemotePullRequest};
use crate::task::domain::{Task, TaskStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A move between two statuses of the same kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StatusChange<S> {
    /// Status before the change.
    pub from: S,
    /// Status after the change.
    pub to: S,
}

impl<S> StatusChange<S> {
    /// Creates a status change.
    #[must_use]
    pub const fn new(from: S, to: S) -> Self {
        Self { from, to }
    }
}

/// Work to carry out once the reconciled state has been persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SideEffect {
    /// Announce the pull request status change.
    NotifyPullRequestStatusChanged(StatusChange<PullRequestStatus>),
    /// Announce the task status change.
    NotifyTaskStatusChanged(StatusChange<TaskStatus>),
    /// Remove the task's worktree.
    CleanupWorktree,
    /// Tell the project that the pull request merged.
    NotifyMergeCompleted,
    /// Stop polling this pull request.
    StopMonitoring,
}

/// Outcome of reconciling one pull request against its remote snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    updated_pull_request: Option<PullRequest>,
    pull_request_change: Option<StatusChange<PullRequestStatus>>,
    rejected_change: Option<StatusChange<PullRequestStatus>>,
    task_change: Option<StatusChange<TaskStatus>>,
    effects: Vec<SideEffect>,
}

impl Reconciliation {
    /// Returns the pull request to persist, when any field changed.
    #[must_use]
    pub const fn updated_pull_request(&self) -> Option<&PullRequest> {
        self.updated_pull_request.as_ref()
    }

    /// Returns the pull request status change, if any.
    #[must_use]
    pub const fn pull_request_change(&self) -> Option<StatusChange<PullRequestStatus>> {
        self.pull_request_change
    }

    /// Returns a remote status the stored pull request may not move to.
    ///
    /// Set when the remote reports, for example, a reopened pull request
    /// whose stored status is already terminal.
    #[must_use]
    pub const fn rejected_change(&self) -> Option<StatusChange<PullRequestStatus>> {
        self.rejected_change
    }

    /// Returns the task status change, if any.
    #[must_use]
    pub const fn task_change(&self) -> Option<StatusChange<TaskStatus>> {
        self.task_change
    }

    /// Returns side effects in execution order.
    #[must_use]
    pub fn effects(&self) -> &[SideEffect] {
        &self.effects
    }

    /// Returns `true` when monitoring of the pull request should end.
    #[must_use]
    pub fn stops_monitoring(&self) -> bool {
        self.effects.contains(&SideEffect::StopMonitoring)
    }

    /// Returns `true` when nothing needs persisting or announcing.
    #[must_use]
    pub const fn is_noop(&self) -> bool {
        self.updated_pull_request.is_none() && self.task_change.is_none()
    }
}

/// Maps a task's current status and its pull request's status to the task
/// status the pair implies.
///
/// - `Open` puts the task into code review.
/// - `Merged` completes the task.
/// - `Closed` cancels the task only while it is in code review.
///
/// Tasks already `Done` or `Cancelled` never move.
#[must_use]
pub const fn map_task_status(current: TaskStatus, pr_status: PullRequestStatus) -> TaskStatus {
    if current.is_terminal() {
        return current;
    }
    match pr_status {
        PullRequestStatus::Open => TaskStatus::CodeReviewing,
        PullRequestStatus::Merged => TaskStatus::Done,
        PullRequestStatus::Closed => match current {
            TaskStatus::CodeReviewing => TaskStatus::Cancelled,
            other => other,
        },
    }
}

/// Reconciles a stored pull request and its task against a remote snapshot
/// observed at `now`.
#[must_use]
pub fn reconcile(
    pull_request: &PullRequest,
    task: &Task,
    remote: &RemotePullRequest,
    now: DateTime<Utc>,
) -> Reconciliation {
    let stored_status = pull_request.status();
    let observed_status = remote.status();
    let mut updated = pull_request.clone();
    let mut pull_request_change = None;
    let mut rejected_change = None;

    if observed_status != stored_status {
        let change = StatusChange::new(stored_status, observed_status);
        if updated.transition_to(observed_status, now).is_ok() {
            pull_request_change = Some(change);
        } else {
            rejected_change = Some(change);
        }
    }
    let details_changed = updated.refresh_details(remote, now);

    let effective_status = updated.status();
    let target = map_task_status(task.status(), effective_status);
    let task_change = (target != task.status()).then(|| StatusChange::new(task.status(), target));

    let mut effects = Vec::new();
    if let Some(change) = pull_request_change {
        effects.push(SideEffect::NotifyPullRequestStatusChanged(change));
    }
    if let Some(change) = task_change {
        effects.push(SideEffect::NotifyTaskStatusChanged(change));
    }
    if pull_request_change.is_some_and(|change| change.to == PullRequestStatus::Merged) {
        effects.push(SideEffect::CleanupWorktree);
        effects.push(SideEffect::NotifyMergeCompleted);
    }
    if effective_status.is_terminal() {
        effects.push(SideEffect::StopMonitoring);
    }

    let changed = pull_request_change.is_some() || details_changed;
    Reconciliation {
        updated_pull_request: changed.then_some(updated),
        pull_request_change,
        rejected_change,
        task_change,
        effects,
    }
}
