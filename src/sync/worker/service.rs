//! Periodic batch reconciliation of every actively tracked pull request.

use super::stats::{CycleSummary, SyncResult, SyncWorkerStats};
use crate::pull_request::domain::PullRequest;
use crate::sync::{
    config::SyncWorkerConfig,
    error::{PullRequestSyncError, PullRequestSyncResult},
    executor::{ReconciliationExecutor, SyncPorts},
    fetch::{RetryPolicy, fetch_with_retry, persist_with_deadline},
    ports::MonitoringControl,
    reconciliation::reconcile,
};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tokio::sync::{Notify, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Errors returned by [`PrSyncWorker`] lifecycle operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SyncWorkerError {
    /// [`PrSyncWorker::start`] was called while the worker was running.
    #[error("sync worker is already running")]
    AlreadyRunning,

    /// The operation requires a running worker.
    #[error("sync worker is not running")]
    NotRunning,
}

/// Result type for worker lifecycle operations.
pub type SyncWorkerResult<T> = Result<T, SyncWorkerError>;

struct RunState {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

struct WorkerInner {
    config: SyncWorkerConfig,
    ports: SyncPorts,
    executor: ReconciliationExecutor,
    monitoring: Option<Arc<dyn MonitoringControl>>,
    stats: Mutex<SyncWorkerStats>,
    run: Mutex<Option<RunState>>,
    force: Notify,
}

/// Reconciles all actively tracked pull requests on a fixed interval.
///
/// Each cycle lists the tracked pull requests, splits them into batches of
/// [`SyncWorkerConfig::batch_size`], and synchronizes them concurrently
/// under one semaphore of [`SyncWorkerConfig::max_concurrent_syncs`]
/// permits shared by the whole cycle. A failure for one pull request never
/// affects its siblings.
#[derive(Clone)]
pub struct PrSyncWorker {
    inner: Arc<WorkerInner>,
}

impl PrSyncWorker {
    /// Creates a stopped worker.
    #[must_use]
    pub fn new(ports: SyncPorts, config: SyncWorkerConfig) -> Self {
        Self::build(ports, config, None)
    }

    /// Creates a stopped worker that ends real-time monitoring sessions for
    /// pull requests it sees reach a terminal status.
    #[must_use]
    pub fn with_monitoring(
        ports: SyncPorts,
        config: SyncWorkerConfig,
        monitoring: Arc<dyn MonitoringControl>,
    ) -> Self {
        Self::build(ports, config, Some(monitoring))
    }

    fn build(
        ports: SyncPorts,
        config: SyncWorkerConfig,
        monitoring: Option<Arc<dyn MonitoringControl>>,
    ) -> Self {
        let executor = ReconciliationExecutor::new(&ports, config.sync_timeout);
        Self {
            inner: Arc::new(WorkerInner {
                config,
                ports,
                executor,
                monitoring,
                stats: Mutex::new(SyncWorkerStats::default()),
                run: Mutex::new(None),
                force: Notify::new(),
            }),
        }
    }

    /// Starts the cycle loop on the current Tokio runtime.
    ///
    /// The first cycle runs immediately, then one per
    /// [`SyncWorkerConfig::sync_interval`]. The loop also ends when `parent`
    /// is cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`SyncWorkerError::AlreadyRunning`] when the loop is running.
    pub fn start(&self, parent: &CancellationToken) -> SyncWorkerResult<()> {
        let mut run = self.inner.lock_run();
        if run.as_ref().is_some_and(|state| !state.handle.is_finished()) {
            return Err(SyncWorkerError::AlreadyRunning);
        }

        let cancel = parent.child_token();
        self.inner.lock_stats().running = true;
        let handle = tokio::spawn(run_loop(Arc::clone(&self.inner), cancel.clone()));
        *run = Some(RunState { cancel, handle });
        info!(
            interval_secs = self.inner.config.sync_interval.as_secs(),
            batch_size = self.inner.config.batch_size,
            max_concurrent_syncs = self.inner.config.max_concurrent_syncs,
            "pull request sync worker started"
        );
        Ok(())
    }

    /// Stops the cycle loop and waits for it to exit.
    ///
    /// An in-flight cycle is abandoned; writes it already made stay.
    ///
    /// # Errors
    ///
    /// Returns [`SyncWorkerError::NotRunning`] when the worker was never
    /// started or has already been stopped.
    pub async fn stop(&self) -> SyncWorkerResult<()> {
        let state = self
            .inner
            .lock_run()
            .take()
            .ok_or(SyncWorkerError::NotRunning)?;
        state.cancel.cancel();
        if let Err(err) = state.handle.await {
            error!(error = %err, "sync worker loop ended abnormally");
        }
        self.inner.lock_stats().running = false;
        info!("pull request sync worker stopped");
        Ok(())
    }

    /// Schedules one extra cycle to run as soon as the current one ends.
    ///
    /// # Errors
    ///
    /// Returns [`SyncWorkerError::NotRunning`] when the loop is not running.
    pub fn force_sync(&self) -> SyncWorkerResult<()> {
        let running = self
            .inner
            .lock_run()
            .as_ref()
            .is_some_and(|state| !state.handle.is_finished());
        if !running {
            return Err(SyncWorkerError::NotRunning);
        }
        self.inner.force.notify_one();
        debug!("forced sync requested");
        Ok(())
    }

    /// Runs a single cycle outside the loop and records it in the stats.
    ///
    /// # Errors
    ///
    /// Returns the listing failure or [`PullRequestSyncError::Timeout`] when
    /// the cycle deadline elapses. Per-PR failures are reported in the
    /// summary instead.
    pub async fn sync_once(&self) -> PullRequestSyncResult<CycleSummary> {
        self.inner.cycle(&CancellationToken::new()).await
    }

    /// Returns a snapshot of the worker's counters.
    #[must_use]
    pub fn get_stats(&self) -> SyncWorkerStats {
        self.inner.lock_stats().clone()
    }
}

async fn run_loop(inner: Arc<WorkerInner>, cancel: CancellationToken) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = inner.cycle(&cancel) => {}
        }
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = inner.force.notified() => debug!("running forced sync cycle"),
            () = tokio::time::sleep(inner.config.sync_interval) => {}
        }
    }
    inner.lock_stats().running = false;
    debug!("sync worker loop exited");
}

impl WorkerInner {
    fn lock_stats(&self) -> MutexGuard<'_, SyncWorkerStats> {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_run(&self) -> MutexGuard<'_, Option<RunState>> {
        self.run.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.config.retry_attempts.max(1),
            delay: self.config.retry_delay,
            call_timeout: self.config.sync_timeout,
        }
    }

    async fn cycle(self: &Arc<Self>, cancel: &CancellationToken) -> PullRequestSyncResult<CycleSummary> {
        let started = Instant::now();
        let cycle_timeout = self.config.cycle_timeout;
        let results = match tokio::time::timeout(cycle_timeout, self.sync_all(cancel)).await {
            Ok(Ok(results)) => results,
            Ok(Err(err)) => {
                self.lock_stats().record_error();
                error!(error = %err, "sync cycle aborted: could not list tracked pull requests");
                return Err(err);
            }
            Err(_) => {
                self.lock_stats().record_error();
                error!(timeout_secs = cycle_timeout.as_secs(), "sync cycle timed out");
                return Err(PullRequestSyncError::Timeout(cycle_timeout));
            }
        };

        let summary = CycleSummary::from_results(&results);
        let took = started.elapsed();
        self.lock_stats()
            .record_cycle(summary, self.ports.clock.utc(), took);
        info!(
            total = summary.total(),
            synced = summary.synced,
            failed = summary.failed,
            status_changes = summary.status_changes,
            duration_ms = u64::try_from(took.as_millis()).unwrap_or(u64::MAX),
            "sync cycle completed"
        );
        Ok(summary)
    }

    async fn sync_all(self: &Arc<Self>, cancel: &CancellationToken) -> PullRequestSyncResult<Vec<SyncResult>> {
        let pull_requests = persist_with_deadline(
            self.config.sync_timeout,
            self.ports.pull_requests.list_actively_monitored(),
        )
        .await?;
        if pull_requests.is_empty() {
            debug!("no tracked pull requests to sync");
            return Ok(Vec::new());
        }

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_syncs.max(1)));
        let mut join_set = JoinSet::new();
        for (batch_index, batch) in pull_requests
            .chunks(self.config.batch_size.max(1))
            .enumerate()
        {
            debug!(batch = batch_index + 1, size = batch.len(), "dispatching sync batch");
            for pull_request in batch {
                join_set.spawn(sync_task(
                    Arc::clone(self),
                    pull_request.clone(),
                    Arc::clone(&semaphore),
                    cancel.clone(),
                ));
            }
        }

        let mut results = Vec::with_capacity(pull_requests.len());
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(err) => error!(error = %err, "pull request sync task failed to complete"),
            }
        }
        Ok(results)
    }

    async fn sync_one(
        &self,
        pull_request: &PullRequest,
        cancel: &CancellationToken,
    ) -> PullRequestSyncResult<SyncResult> {
        let task_id = pull_request.task_id();
        let task = persist_with_deadline(self.config.sync_timeout, self.ports.tasks.find_by_id(task_id))
            .await?
            .ok_or(PullRequestSyncError::TaskNotFound(task_id))?;

        let remote = fetch_with_retry(
            self.ports.remote.as_ref(),
            pull_request,
            self.retry_policy(),
            cancel,
        )
        .await?;

        let plan = reconcile(pull_request, &task, &remote, self.ports.clock.utc());
        let applied = self.executor.apply(pull_request, &task, &plan).await?;

        if applied.stop_monitoring {
            if let Some(monitoring) = &self.monitoring {
                if monitoring.end_session(pull_request.id()) {
                    debug!(pr_id = %pull_request.id(), "ended real-time monitoring session");
                }
            }
        }
        Ok(SyncResult::applied(pull_request.id(), &applied))
    }
}

async fn sync_task(
    inner: Arc<WorkerInner>,
    pull_request: PullRequest,
    semaphore: Arc<Semaphore>,
    cancel: CancellationToken,
) -> SyncResult {
    let pull_request_id = pull_request.id();
    let acquired = tokio::select! {
        biased;
        () = cancel.cancelled() => return SyncResult::failed(pull_request_id, PullRequestSyncError::Cancelled),
        acquired = semaphore.acquire_owned() => acquired,
    };
    let Ok(_permit) = acquired else {
        return SyncResult::failed(pull_request_id, PullRequestSyncError::Cancelled);
    };

    match inner.sync_one(&pull_request, &cancel).await {
        Ok(result) => result,
        Err(err) => {
            warn!(
                pr_id = %pull_request_id,
                pr_number = pull_request.number().value(),
                repository = %pull_request.repository(),
                error = %err,
                "pull request sync failed"
            );
            SyncResult::failed(pull_request_id, err)
        }
    }
}
