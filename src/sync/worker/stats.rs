//! Per-PR results and aggregate worker statistics.

use crate::pull_request::domain::{PullRequestId, PullRequestStatus};
use crate::sync::{error::PullRequestSyncError, executor::AppliedReconciliation};
use crate::task::domain::TaskStatus;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Result of synchronizing one pull request in one cycle.
#[derive(Debug, Clone)]
pub struct SyncResult {
    /// Synchronized pull request.
    pub pull_request_id: PullRequestId,
    /// Pull request status before and after, when this cycle changed it.
    pub pull_request_status: Option<(PullRequestStatus, PullRequestStatus)>,
    /// Task status before and after, when this cycle changed it.
    pub task_status: Option<(TaskStatus, TaskStatus)>,
    /// Failure detail; `None` on success.
    pub error: Option<PullRequestSyncError>,
}

impl SyncResult {
    pub(crate) fn applied(pull_request_id: PullRequestId, applied: &AppliedReconciliation) -> Self {
        Self {
            pull_request_id,
            pull_request_status: applied.pull_request_change.map(|change| (change.from, change.to)),
            task_status: applied.task_change.map(|change| (change.from, change.to)),
            error: None,
        }
    }

    pub(crate) const fn failed(pull_request_id: PullRequestId, error: PullRequestSyncError) -> Self {
        Self {
            pull_request_id,
            pull_request_status: None,
            task_status: None,
            error: Some(error),
        }
    }

    /// Returns `true` when the pull request synchronized without error.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Returns `true` when this cycle persisted a status change.
    #[must_use]
    pub const fn status_changed(&self) -> bool {
        self.pull_request_status.is_some() || self.task_status.is_some()
    }
}

/// Aggregate outcome of one completed cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    /// Pull requests synchronized without error.
    pub synced: usize,
    /// Pull requests whose sync failed.
    pub failed: usize,
    /// Pull requests whose status or task status changed.
    pub status_changes: usize,
}

impl CycleSummary {
    /// Folds per-PR results into a summary.
    #[must_use]
    pub fn from_results(results: &[SyncResult]) -> Self {
        results.iter().fold(Self::default(), |mut summary, result| {
            if result.is_success() {
                summary.synced += 1;
            } else {
                summary.failed += 1;
            }
            if result.status_changed() {
                summary.status_changes += 1;
            }
            summary
        })
    }

    /// Total pull requests attempted.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.synced + self.failed
    }
}

/// Snapshot returned by [`super::PrSyncWorker::get_stats`].
///
/// Counters are cumulative across cycles and reset only when the worker is
/// constructed anew.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncWorkerStats {
    /// Whether the cycle loop is running.
    pub running: bool,
    /// Completion time of the most recent cycle.
    pub last_cycle_at: Option<DateTime<Utc>>,
    /// Cycles that completed their listing query.
    pub cycle_count: u64,
    /// Cycles aborted by a listing failure or the cycle deadline.
    pub error_count: u64,
    /// Per-PR sync failures across all cycles.
    pub total_sync_failures: u64,
    /// Per-PR status changes across all cycles.
    pub total_status_changes: u64,
    /// Wall time of the most recent cycle.
    pub last_cycle_duration: Option<Duration>,
    /// Pull requests synchronized in the most recent cycle.
    pub last_cycle_synced: usize,
    /// Failures in the most recent cycle.
    pub last_cycle_failed: usize,
    /// Status changes in the most recent cycle.
    pub last_cycle_status_changes: usize,
}

impl SyncWorkerStats {
    pub(crate) fn record_cycle(&mut self, summary: CycleSummary, at: DateTime<Utc>, took: Duration) {
        self.cycle_count += 1;
        self.last_cycle_at = Some(at);
        self.last_cycle_duration = Some(took);
        self.last_cycle_synced = summary.synced;
        self.last_cycle_failed = summary.failed;
        self.last_cycle_status_changes = summary.status_changes;
        self.total_sync_failures += widen(summary.failed);
        self.total_status_changes += widen(summary.status_changes);
    }

    pub(crate) const fn record_error(&mut self) {
        self.error_count += 1;
    }
}

fn widen(count: usize) -> u64 {
    u64::try_from(count).unwrap_or(u64::MAX)
}
