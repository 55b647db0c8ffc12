//! Applies a [`Reconciliation`] to persistence and collaborators.
//!
//! Persistence is guarded: the pull request write only lands while the stored
//! status still equals the status the caller read, and the task write only
//! lands while the task is still in its old status. Side effects belong to
//! whichever writer won, so a monitor session and the batch worker racing
//! on the same pull request announce each transition at most once.

use crate::pull_request::{
    domain::{PullRequest, PullRequestStatus},
    ports::{PullRequestRepository, RemotePullRequestClient},
};
use crate::sync::{
    error::PullRequestSyncResult,
    fetch::persist_with_deadline,
    ports::{EntityType, NotificationPublisher, ProjectMessageType, WorktreeManager},
    reconciliation::{Reconciliation, SideEffect, StatusChange},
};
use crate::task::{
    domain::{Task, TaskStatus},
    ports::TaskRepository,
};
use mockable::Clock;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Collaborators shared by the monitor, the worker, and the executor.
#[derive(Clone)]
pub struct SyncPorts {
    /// Pull request persistence.
    pub pull_requests: Arc<dyn PullRequestRepository>,
    /// Task persistence.
    pub tasks: Arc<dyn TaskRepository>,
    /// Remote code-hosting client.
    pub remote: Arc<dyn RemotePullRequestClient>,
    /// Event delivery.
    pub notifier: Arc<dyn NotificationPublisher>,
    /// Worktree cleanup.
    pub worktrees: Arc<dyn WorktreeManager>,
    /// Source of timestamps.
    pub clock: Arc<dyn Clock + Send + Sync>,
}

/// What a call to [`ReconciliationExecutor::apply`] actually changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppliedReconciliation {
    /// Pull request status change persisted by this writer.
    pub pull_request_change: Option<StatusChange<PullRequestStatus>>,
    /// Task status change persisted by this writer.
    pub task_change: Option<StatusChange<TaskStatus>>,
    /// Whether monitoring of the pull request should end.
    pub stop_monitoring: bool,
    /// Whether another writer changed the records first.
    pub superseded: bool,
}

impl AppliedReconciliation {
    /// Returns `true` when this writer persisted any status change.
    #[must_use]
    pub const fn changed_status(&self) -> bool {
        self.pull_request_change.is_some() || self.task_change.is_some()
    }
}

/// Executes reconciliation plans.
#[derive(Clone)]
pub struct ReconciliationExecutor {
    pull_requests: Arc<dyn PullRequestRepository>,
    tasks: Arc<dyn TaskRepository>,
    notifier: Arc<dyn NotificationPublisher>,
    worktrees: Arc<dyn WorktreeManager>,
    call_timeout: Duration,
}

impl ReconciliationExecutor {
    /// Creates an executor whose persistence and collaborator calls are each
    /// bounded by `call_timeout`.
    #[must_use]
    pub fn new(ports: &SyncPorts, call_timeout: Duration) -> Self {
        Self {
            pull_requests: Arc::clone(&ports.pull_requests),
            tasks: Arc::clone(&ports.tasks),
            notifier: Arc::clone(&ports.notifier),
            worktrees: Arc::clone(&ports.worktrees),
            call_timeout,
        }
    }

    /// Persists the plan and runs the side effects this writer is entitled
    /// to.
    ///
    /// `pull_request` and `task` are the records the plan was computed from.
    /// Notification and cleanup failures are logged and never undo the
    /// persisted change.
    ///
    /// # Errors
    ///
    /// Returns persistence errors or timeouts from the guarded writes. When
    /// the task write fails after the pull request write landed, the pull
    /// request's side effects have already run.
    pub async fn apply(
        &self,
        pull_request: &PullRequest,
        task: &Task,
        plan: &Reconciliation,
    ) -> PullRequestSyncResult<AppliedReconciliation> {
        if let Some(rejected) = plan.rejected_change() {
            warn!(
                pr_id = %pull_request.id(),
                pr_number = pull_request.number().value(),
                stored_status = %rejected.from,
                remote_status = %rejected.to,
                "ignoring remote status that would leave a terminal pull request status"
            );
        }

        let mut applied = AppliedReconciliation {
            stop_monitoring: plan.stops_monitoring(),
            ..AppliedReconciliation::default()
        };

        if let Some(updated) = plan.updated_pull_request() {
            let won = persist_with_deadline(
                self.call_timeout,
                self.pull_requests
                    .update_if_status(updated, pull_request.status()),
            )
            .await?;
            if !won {
                debug!(
                    pr_id = %pull_request.id(),
                    expected_status = %pull_request.status(),
                    "pull request changed concurrently; skipping side effects"
                );
                applied.superseded = true;
                return Ok(applied);
            }
            applied.pull_request_change = plan.pull_request_change();
        }

        // Pull request effects run even when the task write fails.
        let task_write = match plan.task_change() {
            Some(change) => self.write_task(task, change, &mut applied).await,
            None => Ok(()),
        };

        let current = plan.updated_pull_request().unwrap_or(pull_request);
        for effect in plan.effects() {
            self.dispatch(*effect, current, task, &applied).await;
        }
        task_write.map(|()| applied)
    }

    async fn write_task(
        &self,
        task: &Task,
        change: StatusChange<TaskStatus>,
        applied: &mut AppliedReconciliation,
    ) -> PullRequestSyncResult<()> {
        let written = persist_with_deadline(
            self.call_timeout,
            self.tasks.transition_status(task.id(), change.from, change.to),
        )
        .await;
        match written {
            Ok(true) => applied.task_change = Some(change),
            Ok(false) => {
                debug!(
                    task_id = %task.id(),
                    expected_status = %change.from,
                    "task changed concurrently; skipping its notification"
                );
                applied.superseded = true;
            }
            Err(err) => {
                warn!(
                    task_id = %task.id(),
                    old_status = %change.from,
                    new_status = %change.to,
                    error = %err,
                    "task status write failed"
                );
                return Err(err);
            }
        }
        Ok(())
    }

    async fn dispatch(
        &self,
        effect: SideEffect,
        pull_request: &PullRequest,
        task: &Task,
        applied: &AppliedReconciliation,
    ) {
        let merge_won = applied
            .pull_request_change
            .is_some_and(|change| change.to == PullRequestStatus::Merged);
        match effect {
            SideEffect::NotifyPullRequestStatusChanged(change)
                if applied.pull_request_change == Some(change) =>
            {
                info!(
                    pr_id = %pull_request.id(),
                    pr_number = pull_request.number().value(),
                    repository = %pull_request.repository(),
                    old_status = %change.from,
                    new_status = %change.to,
                    "pull request status changed"
                );
                self.notify_status(
                    pull_request.id().into_inner(),
                    task,
                    EntityType::PullRequest,
                    change.from.as_str(),
                    change.to.as_str(),
                )
                .await;
            }
            SideEffect::NotifyTaskStatusChanged(change) if applied.task_change == Some(change) => {
                info!(
                    task_id = %task.id(),
                    pr_id = %pull_request.id(),
                    old_status = %change.from,
                    new_status = %change.to,
                    "task status changed"
                );
                self.notify_status(
                    task.id().into_inner(),
                    task,
                    EntityType::Task,
                    change.from.as_str(),
                    change.to.as_str(),
                )
                .await;
            }
            SideEffect::CleanupWorktree if merge_won => self.cleanup_worktree(task).await,
            SideEffect::NotifyMergeCompleted if merge_won => {
                self.notify_merge(pull_request, task).await;
            }
            _ => {}
        }
    }

    async fn notify_status(
        &self,
        entity_id: uuid::Uuid,
        task: &Task,
        entity_type: EntityType,
        old_status: &str,
        new_status: &str,
    ) {
        let result = tokio::time::timeout(
            self.call_timeout,
            self.notifier.notify_status_changed(
                entity_id,
                task.project_id(),
                entity_type,
                old_status,
                new_status,
            ),
        )
        .await;
        match result {
            Ok(Ok(())) => {}
            Ok(Err(err)) => warn!(
                %entity_id,
                %entity_type,
                error = %err,
                "status change notification failed"
            ),
            Err(_) => warn!(%entity_id, %entity_type, "status change notification timed out"),
        }
    }

    async fn cleanup_worktree(&self, task: &Task) {
        let lookup = tokio::time::timeout(
            self.call_timeout,
            self.worktrees.find_by_task_id(task.id()),
        )
        .await;
        match lookup {
            Ok(Ok(Some(worktree))) => {
                let cleanup = tokio::time::timeout(
                    self.call_timeout,
                    self.worktrees.cleanup(task.id(), task.project_id()),
                )
                .await;
                match cleanup {
                    Ok(Ok(())) => info!(
                        task_id = %task.id(),
                        path = %worktree.path,
                        "worktree removed after merge"
                    ),
                    Ok(Err(err)) => warn!(task_id = %task.id(), error = %err, "worktree cleanup failed"),
                    Err(_) => warn!(task_id = %task.id(), "worktree cleanup timed out"),
                }
            }
            Ok(Ok(None)) => debug!(task_id = %task.id(), "no worktree to clean up"),
            Ok(Err(err)) => warn!(task_id = %task.id(), error = %err, "worktree lookup failed"),
            Err(_) => warn!(task_id = %task.id(), "worktree lookup timed out"),
        }
    }

    async fn notify_merge(&self, pull_request: &PullRequest, task: &Task) {
        let merge = pull_request.merge();
        let payload = json!({
            "pull_request_id": pull_request.id(),
            "task_id": task.id(),
            "repository": pull_request.repository(),
            "number": pull_request.number(),
            "merge_commit_sha": merge.commit_sha,
            "merged_by": merge.merged_by,
            "merged_at": merge.merged_at,
        });
        let result = tokio::time::timeout(
            self.call_timeout,
            self.notifier.send_project_message(
                task.project_id(),
                ProjectMessageType::PullRequestMerged,
                payload,
            ),
        )
        .await;
        match result {
            Ok(Ok(())) => {}
            Ok(Err(err)) => warn!(
                pr_id = %pull_request.id(),
                error = %err,
                "merge notification failed"
            ),
            Err(_) => warn!(pr_id = %pull_request.id(), "merge notification timed out"),
        }
    }
}
