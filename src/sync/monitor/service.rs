//! Real-time pull request monitor.

use super::{
    registry::SessionRegistry,
    session::{MonitorSession, SessionHandle, SessionSnapshot, SessionTermination},
};
use crate::pull_request::{
    domain::{PullRequest, PullRequestId, RemotePullRequest},
    ports::PullRequestRepositoryError,
};
use crate::sync::{
    config::MonitorConfig,
    error::{PullRequestSyncError, PullRequestSyncResult},
    executor::{AppliedReconciliation, ReconciliationExecutor, SyncPorts},
    fetch::{fetch_with_deadline, persist_with_deadline},
    ports::MonitoringControl,
    reconciliation::reconcile,
};
use crate::task::{domain::TaskId, ports::TaskRepositoryError};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{debug, error, info, warn};

/// Errors returned by [`PrMonitor`] operations.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// The monitor has been stopped and accepts no new sessions.
    #[error("pull request monitor has been stopped")]
    Stopped,

    /// No active session exists for the pull request.
    #[error("no monitoring session for pull request {0}")]
    SessionNotFound(PullRequestId),

    /// The task owning the pull request could not be loaded.
    #[error("task {task_id} owning pull request {pull_request_id} was not found")]
    TaskNotFound {
        /// Pull request whose task is missing.
        pull_request_id: PullRequestId,
        /// Missing task.
        task_id: TaskId,
    },

    /// Task lookup failed.
    #[error(transparent)]
    TaskRepository(#[from] TaskRepositoryError),

    /// Pull request listing failed.
    #[error(transparent)]
    PullRequestRepository(#[from] PullRequestRepositoryError),

    /// A persistence call exceeded its deadline.
    #[error("persistence call timed out after {0:?}")]
    Timeout(Duration),

    /// Polling loops were still running when the bounded wait ran out.
    #[error("monitoring sessions did not exit within {0:?}")]
    StopTimedOut(Duration),
}

/// Result type for monitor operations.
pub type MonitorResult<T> = Result<T, MonitorError>;

enum PollOutcome {
    Continue,
    Retry,
    Finished(SessionTermination),
}

struct MonitorInner {
    config: MonitorConfig,
    ports: SyncPorts,
    executor: ReconciliationExecutor,
    registry: SessionRegistry,
    shutdown: CancellationToken,
    tracker: TaskTracker,
}

/// Keeps one polling session per actively tracked pull request.
///
/// Each session polls the remote service on its own timer, reconciles the
/// result, and ends when the pull request reaches a terminal status, when it
/// is stopped, or when consecutive fetch failures reach
/// [`MonitorConfig::max_retries`]. Abandoned sessions are not restarted; the
/// batch worker keeps reconciling their pull requests.
#[derive(Clone)]
pub struct PrMonitor {
    inner: Arc<MonitorInner>,
}

impl PrMonitor {
    /// Creates a monitor with its own shutdown signal.
    #[must_use]
    pub fn new(ports: SyncPorts, config: MonitorConfig) -> Self {
        Self::with_shutdown(ports, config, &CancellationToken::new())
    }

    /// Creates a monitor whose sessions also end when `parent` is cancelled.
    #[must_use]
    pub fn with_shutdown(ports: SyncPorts, config: MonitorConfig, parent: &CancellationToken) -> Self {
        let executor = ReconciliationExecutor::new(&ports, config.fetch_timeout);
        Self {
            inner: Arc::new(MonitorInner {
                config,
                ports,
                executor,
                registry: SessionRegistry::default(),
                shutdown: parent.child_token(),
                tracker: TaskTracker::new(),
            }),
        }
    }

    /// Starts a session for every actively monitored pull request.
    ///
    /// Pull requests whose task cannot be loaded are logged and skipped.
    /// Returns the number of sessions started by this call.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Stopped`] after [`Self::stop`], or a
    /// repository error when the listing query fails.
    pub async fn start_monitoring(&self) -> MonitorResult<usize> {
        self.ensure_running()?;
        let pull_requests = persist_with_deadline(
            self.inner.config.fetch_timeout,
            self.inner.ports.pull_requests.list_actively_monitored(),
        )
        .await
        .map_err(into_monitor_error)?;

        let mut started = 0_usize;
        for pull_request in pull_requests {
            let pull_request_id = pull_request.id();
            let was_active = self.inner.registry.contains(pull_request_id);
            match self.monitor_pull_request(pull_request).await {
                Ok(()) if !was_active && self.inner.registry.contains(pull_request_id) => {
                    started += 1;
                }
                Ok(()) => {}
                Err(err) => warn!(
                    pr_id = %pull_request_id,
                    error = %err,
                    "could not start monitoring session"
                ),
            }
        }
        info!(started, active = self.active_count(), "pull request monitoring started");
        Ok(started)
    }

    /// Starts monitoring one pull request.
    ///
    /// Calling it again for a pull request that already has a session, or
    /// for a pull request in a terminal status, does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Stopped`] after [`Self::stop`] and
    /// [`MonitorError::TaskNotFound`] when the owning task cannot be loaded.
    pub async fn monitor_pull_request(&self, pull_request: PullRequest) -> MonitorResult<()> {
        self.ensure_running()?;
        let pull_request_id = pull_request.id();
        if self.inner.registry.contains(pull_request_id) {
            debug!(pr_id = %pull_request_id, "pull request already monitored");
            return Ok(());
        }
        if pull_request.status().is_terminal() {
            debug!(
                pr_id = %pull_request_id,
                status = %pull_request.status(),
                "not monitoring pull request in terminal status"
            );
            return Ok(());
        }

        let task_id = pull_request.task_id();
        let task = persist_with_deadline(
            self.inner.config.fetch_timeout,
            self.inner.ports.tasks.find_by_id(task_id),
        )
        .await
        .map_err(into_monitor_error)?
        .ok_or(MonitorError::TaskNotFound {
            pull_request_id,
            task_id,
        })?;

        let session = MonitorSession::new(pull_request, task);
        let handle = Arc::new(SessionHandle::new(
            self.inner.shutdown.child_token(),
            &session,
        ));
        if !self
            .inner
            .registry
            .try_insert(pull_request_id, Arc::clone(&handle))
        {
            return Ok(());
        }

        info!(
            pr_id = %pull_request_id,
            pr_number = session.pull_request.number().value(),
            repository = %session.pull_request.repository(),
            "monitoring session started"
        );
        self.inner
            .tracker
            .spawn(run_session(Arc::clone(&self.inner), handle, session));
        Ok(())
    }

    /// Ends the session for one pull request.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::SessionNotFound`] when no session is active.
    pub fn stop_monitoring(&self, pull_request_id: PullRequestId) -> MonitorResult<()> {
        let handle = self
            .inner
            .registry
            .remove(pull_request_id, SessionTermination::Stopped)
            .ok_or(MonitorError::SessionNotFound(pull_request_id))?;
        handle.cancel();
        info!(pr_id = %pull_request_id, "monitoring session stopped");
        Ok(())
    }

    /// Asks a session to poll immediately instead of waiting for its timer.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::SessionNotFound`] when no session is active.
    pub fn refresh_pull_request(&self, pull_request_id: PullRequestId) -> MonitorResult<()> {
        let handle = self
            .inner
            .registry
            .get(pull_request_id)
            .ok_or(MonitorError::SessionNotFound(pull_request_id))?;
        handle.request_refresh();
        debug!(pr_id = %pull_request_id, "refresh requested");
        Ok(())
    }

    /// Cancels every session and waits, up to
    /// [`MonitorConfig::stop_timeout`], for all polling loops to exit.
    ///
    /// Calling it again is harmless.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::StopTimedOut`] when loops are still running
    /// after the bounded wait.
    pub async fn stop(&self) -> MonitorResult<()> {
        self.inner.shutdown.cancel();
        let drained = self.inner.registry.drain();
        for handle in &drained {
            handle.cancel();
        }
        self.inner.tracker.close();

        let stop_timeout = self.inner.config.stop_timeout;
        tokio::time::timeout(stop_timeout, self.inner.tracker.wait())
            .await
            .map_err(|_| MonitorError::StopTimedOut(stop_timeout))?;
        info!(sessions = drained.len(), "pull request monitor stopped");
        Ok(())
    }

    /// Returns `true` while a session is active for the pull request.
    #[must_use]
    pub fn is_monitoring(&self, pull_request_id: PullRequestId) -> bool {
        self.inner.registry.contains(pull_request_id)
    }

    /// Returns the number of active sessions.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.inner.registry.len()
    }

    /// Returns the latest state published by an active session.
    #[must_use]
    pub fn session_snapshot(&self, pull_request_id: PullRequestId) -> Option<SessionSnapshot> {
        self.inner
            .registry
            .get(pull_request_id)
            .map(|handle| handle.snapshot())
    }

    /// Returns why the most recent session for the pull request ended.
    #[must_use]
    pub fn last_termination(&self, pull_request_id: PullRequestId) -> Option<SessionTermination> {
        self.inner.registry.termination(pull_request_id)
    }

    fn ensure_running(&self) -> MonitorResult<()> {
        if self.inner.shutdown.is_cancelled() {
            return Err(MonitorError::Stopped);
        }
        Ok(())
    }
}

impl MonitoringControl for PrMonitor {
    fn end_session(&self, pull_request_id: PullRequestId) -> bool {
        self.stop_monitoring(pull_request_id).is_ok()
    }
}

fn into_monitor_error(err: PullRequestSyncError) -> MonitorError {
    match err {
        PullRequestSyncError::TaskRepository(inner) => MonitorError::TaskRepository(inner),
        PullRequestSyncError::PullRequestRepository(inner) => {
            MonitorError::PullRequestRepository(inner)
        }
        PullRequestSyncError::Timeout(after) => MonitorError::Timeout(after),
        other => MonitorError::PullRequestRepository(PullRequestRepositoryError::persistence(other)),
    }
}

async fn run_session(inner: Arc<MonitorInner>, handle: Arc<SessionHandle>, mut session: MonitorSession) {
    let pull_request_id = session.pull_request.id();
    let mut wait = Duration::ZERO;
    let termination = loop {
        tokio::select! {
            biased;
            () = handle.cancelled() => break SessionTermination::Stopped,
            () = handle.refresh_requested() => {
                debug!(pr_id = %pull_request_id, "polling on refresh request");
            }
            () = tokio::time::sleep(wait) => {}
        }

        match inner.poll(&mut session, &handle).await {
            PollOutcome::Continue => wait = inner.config.poll_interval,
            PollOutcome::Retry => wait = inner.config.retry_delay,
            PollOutcome::Finished(termination) => break termination,
        }
    };

    let label = termination.label();
    if inner
        .registry
        .finish(pull_request_id, &handle, termination)
    {
        info!(pr_id = %pull_request_id, outcome = label, "monitoring session ended");
    }
}

impl MonitorInner {
    async fn poll(&self, session: &mut MonitorSession, handle: &SessionHandle) -> PollOutcome {
        let fetched = tokio::select! {
            biased;
            () = handle.cancelled() => return PollOutcome::Finished(SessionTermination::Stopped),
            result = fetch_with_deadline(
                self.ports.remote.as_ref(),
                &session.pull_request,
                self.config.fetch_timeout,
            ) => result,
        };

        let pull_request_id = session.pull_request.id();
        let remote = match fetched {
            Ok(remote) => remote,
            Err(err) if err.is_retryable() => {
                let failures = session.record_failure();
                handle.publish(session);
                if failures >= self.config.max_retries {
                    error!(
                        pr_id = %pull_request_id,
                        attempts = failures,
                        error = %err,
                        "abandoning monitoring session after repeated fetch failures"
                    );
                    return PollOutcome::Finished(SessionTermination::RetriesExhausted {
                        attempts: failures,
                        error: err,
                    });
                }
                warn!(
                    pr_id = %pull_request_id,
                    attempt = failures,
                    max_retries = self.config.max_retries,
                    error = %err,
                    "pull request poll failed"
                );
                return PollOutcome::Retry;
            }
            Err(err) => {
                error!(
                    pr_id = %pull_request_id,
                    error = %err,
                    "pull request poll failed permanently"
                );
                return PollOutcome::Finished(SessionTermination::Failed { error: err.into() });
            }
        };

        session.record_success(self.ports.clock.utc());
        let result = self.reconcile_session(session, &remote).await;
        handle.publish(session);
        match result {
            Ok(applied) if applied.stop_monitoring => PollOutcome::Finished(SessionTermination::Completed {
                status: session.pull_request.status(),
            }),
            Ok(_) => PollOutcome::Continue,
            Err(err @ PullRequestSyncError::PullRequestNotFound(_)) => {
                warn!(pr_id = %pull_request_id, error = %err, "monitored pull request vanished");
                PollOutcome::Finished(SessionTermination::Failed { error: err })
            }
            Err(err) => {
                warn!(
                    pr_id = %pull_request_id,
                    error = %err,
                    "reconciliation failed; will try again on the next poll"
                );
                PollOutcome::Continue
            }
        }
    }

    async fn reconcile_session(
        &self,
        session: &mut MonitorSession,
        remote: &RemotePullRequest,
    ) -> PullRequestSyncResult<AppliedReconciliation> {
        let deadline = self.config.fetch_timeout;
        let pull_request_id = session.pull_request.id();
        let pull_request = persist_with_deadline(
            deadline,
            self.ports.pull_requests.find_by_id(pull_request_id),
        )
        .await?
        .ok_or(PullRequestSyncError::PullRequestNotFound(pull_request_id))?;
        let task_id = pull_request.task_id();
        let mut task = persist_with_deadline(deadline, self.ports.tasks.find_by_id(task_id))
            .await?
            .ok_or(PullRequestSyncError::TaskNotFound(task_id))?;

        let now = self.ports.clock.utc();
        let plan = reconcile(&pull_request, &task, remote, now);
        let applied = self.executor.apply(&pull_request, &task, &plan).await?;

        if let Some(change) = applied.task_change {
            task.set_status(change.to, now);
        }
        session.pull_request = plan.updated_pull_request().cloned().unwrap_or(pull_request);
        session.task = task;
        Ok(applied)
    }
}
