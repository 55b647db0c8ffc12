//! Per-pull-request monitoring session state.

use crate::pull_request::{
    domain::{PullRequest, PullRequestId, PullRequestNumber, PullRequestStatus},
    ports::RemoteClientError,
};
use crate::sync::error::PullRequestSyncError;
use crate::task::domain::{Task, TaskStatus};
use chrono::{DateTime, Utc};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

/// Why a monitoring session ended.
#[derive(Debug, Clone)]
pub enum SessionTermination {
    /// The pull request reached a terminal status.
    Completed {
        /// Final pull request status.
        status: PullRequestStatus,
    },
    /// Monitoring was stopped on request.
    Stopped,
    /// Consecutive fetch failures reached the configured bound.
    RetriesExhausted {
        /// Number of consecutive failed fetches.
        attempts: u32,
        /// Last fetch error.
        error: RemoteClientError,
    },
    /// A failure that retrying cannot fix, such as a missing pull request.
    Failed {
        /// The failure.
        error: PullRequestSyncError,
    },
}

impl SessionTermination {
    /// Returns a short label for logs.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Completed { .. } => "completed",
            Self::Stopped => "stopped",
            Self::RetriesExhausted { .. } => "retries_exhausted",
            Self::Failed { .. } => "failed",
        }
    }
}

/// Read-only view of an active session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// Monitored pull request.
    pub pull_request_id: PullRequestId,
    /// Remote pull request number.
    pub pull_request_number: PullRequestNumber,
    /// Last known pull request status.
    pub pull_request_status: PullRequestStatus,
    /// Last known status of the owning task.
    pub task_status: TaskStatus,
    /// Consecutive failed fetches.
    pub retry_count: u32,
    /// Time of the last successful poll.
    pub last_poll_at: Option<DateTime<Utc>>,
}

/// Working state owned by one session's polling loop.
#[derive(Debug, Clone)]
pub(crate) struct MonitorSession {
    pub(crate) pull_request: PullRequest,
    pub(crate) task: Task,
    retry_count: u32,
    last_poll_at: Option<DateTime<Utc>>,
}

impl MonitorSession {
    pub(crate) const fn new(pull_request: PullRequest, task: Task) -> Self {
        Self {
            pull_request,
            task,
            retry_count: 0,
            last_poll_at: None,
        }
    }

    /// Counts a failed fetch and returns the consecutive failure count.
    pub(crate) const fn record_failure(&mut self) -> u32 {
        self.retry_count = self.retry_count.saturating_add(1);
        self.retry_count
    }

    pub(crate) const fn record_success(&mut self, at: DateTime<Utc>) {
        self.retry_count = 0;
        self.last_poll_at = Some(at);
    }

    pub(crate) fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            pull_request_id: self.pull_request.id(),
            pull_request_number: self.pull_request.number(),
            pull_request_status: self.pull_request.status(),
            task_status: self.task.status(),
            retry_count: self.retry_count,
            last_poll_at: self.last_poll_at,
        }
    }
}

/// Shared handle through which the monitor signals a session's loop.
#[derive(Debug)]
pub(crate) struct SessionHandle {
    cancel: CancellationToken,
    refresh: Notify,
    snapshot: Mutex<SessionSnapshot>,
}

impl SessionHandle {
    pub(crate) fn new(cancel: CancellationToken, session: &MonitorSession) -> Self {
        Self {
            cancel,
            refresh: Notify::new(),
            snapshot: Mutex::new(session.snapshot()),
        }
    }

    pub(crate) fn cancel(&self) {
        self.cancel.cancel();
    }

    pub(crate) async fn cancelled(&self) {
        self.cancel.cancelled().await;
    }

    pub(crate) fn request_refresh(&self) {
        self.refresh.notify_one();
    }

    pub(crate) async fn refresh_requested(&self) {
        self.refresh.notified().await;
    }

    pub(crate) fn publish(&self, session: &MonitorSession) {
        *self.lock_snapshot() = session.snapshot();
    }

    pub(crate) fn snapshot(&self) -> SessionSnapshot {
        self.lock_snapshot().clone()
    }

    fn lock_snapshot(&self) -> MutexGuard<'_, SessionSnapshot> {
        self.snapshot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
