//! Deadline-bounded remote fetches with an optional bounded retry loop.

use crate::pull_request::{
    domain::{PullRequest, RemotePullRequest},
    ports::{RemoteClientError, RemoteClientResult, RemotePullRequestClient},
};
use crate::sync::error::{PullRequestSyncError, PullRequestSyncResult};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Fetches one pull request, converting an elapsed deadline into
/// [`RemoteClientError::Timeout`].
pub async fn fetch_with_deadline(
    client: &dyn RemotePullRequestClient,
    pull_request: &PullRequest,
    deadline: Duration,
) -> RemoteClientResult<RemotePullRequest> {
    tokio::time::timeout(
        deadline,
        client.fetch_pull_request(pull_request.repository(), pull_request.number()),
    )
    .await
    .unwrap_or(Err(RemoteClientError::Timeout(deadline)))
}

/// Runs a persistence call under a deadline.
///
/// # Errors
///
/// Returns [`PullRequestSyncError::Timeout`] when the deadline elapses, or
/// the call's own error converted into [`PullRequestSyncError`].
pub async fn persist_with_deadline<T, E>(
    deadline: Duration,
    call: impl Future<Output = Result<T, E>>,
) -> PullRequestSyncResult<T>
where
    PullRequestSyncError: From<E>,
{
    match tokio::time::timeout(deadline, call).await {
        Ok(result) => result.map_err(PullRequestSyncError::from),
        Err(_) => Err(PullRequestSyncError::Timeout(deadline)),
    }
}

/// Bounds on repeated fetch attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub attempts: u32,
    /// Fixed delay between attempts.
    pub delay: Duration,
    /// Deadline for each attempt; also caps any rate-limit wait.
    pub call_timeout: Duration,
}

impl RetryPolicy {
    /// Returns the wait before the next attempt after `err`.
    ///
    /// A rate-limit hint longer than the fixed delay is honoured up to the
    /// per-call deadline.
    #[must_use]
    pub fn wait_after(&self, err: &RemoteClientError) -> Duration {
        let hinted = err.retry_after().unwrap_or_default();
        self.delay.max(hinted.min(self.call_timeout))
    }
}

/// Fetches one pull request, retrying retryable failures with a fixed delay.
///
/// # Errors
///
/// Returns the last remote error once attempts are exhausted, the first
/// non-retryable remote error immediately, or
/// [`PullRequestSyncError::Cancelled`] when `cancel` fires first.
pub async fn fetch_with_retry(
    client: &dyn RemotePullRequestClient,
    pull_request: &PullRequest,
    policy: RetryPolicy,
    cancel: &CancellationToken,
) -> PullRequestSyncResult<RemotePullRequest> {
    let mut attempt: u32 = 1;
    loop {
        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(PullRequestSyncError::Cancelled),
            result = fetch_with_deadline(client, pull_request, policy.call_timeout) => result,
        };

        let err = match result {
            Ok(remote) => return Ok(remote),
            Err(err) if !err.is_retryable() || attempt >= policy.attempts => {
                return Err(err.into());
            }
            Err(err) => err,
        };

        let wait = policy.wait_after(&err);
        warn!(
            pr_id = %pull_request.id(),
            pr_number = pull_request.number().value(),
            repository = %pull_request.repository(),
            attempt,
            max_attempts = policy.attempts,
            wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
            error = %err,
            "pull request fetch failed; retrying"
        );
        tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(PullRequestSyncError::Cancelled),
            () = tokio::time::sleep(wait) => {}
        }
        attempt += 1;
    }
}
