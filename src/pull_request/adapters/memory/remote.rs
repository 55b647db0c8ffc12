//! Scripted remote client for deterministic sync tests.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::pull_request::{
    domain::{PullRequestNumber, RemotePullRequest, RepositoryFullName},
    ports::{RemoteClientError, RemoteClientResult, RemotePullRequestClient},
};

type ScriptKey = (RepositoryFullName, PullRequestNumber);

/// Remote client that replays configured responses.
///
/// Each pull request has a standing response plus an optional queue of
/// one-shot responses consumed first. Unscripted pull requests are reported
/// as not found. The client also counts calls and tracks how many are in
/// flight at once.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRemoteClient {
    state: Arc<Mutex<ScriptState>>,
    latency: Duration,
}

#[derive(Debug, Default)]
struct ScriptState {
    standing: HashMap<ScriptKey, RemoteClientResult<RemotePullRequest>>,
    queued: HashMap<ScriptKey, VecDeque<RemoteClientResult<RemotePullRequest>>>,
    calls: HashMap<ScriptKey, usize>,
    in_flight: usize,
    max_in_flight: usize,
}

impl ScriptedRemoteClient {
    /// Creates a client with no scripted responses and no latency.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every response by `latency`.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Sets the standing response for a pull request.
    pub fn set_response(
        &self,
        repository: &RepositoryFullName,
        number: PullRequestNumber,
        response: RemoteClientResult<RemotePullRequest>,
    ) {
        self.lock()
            .standing
            .insert((repository.clone(), number), response);
    }

    /// Queues a one-shot response served before the standing one.
    pub fn push_response(
        &self,
        repository: &RepositoryFullName,
        number: PullRequestNumber,
        response: RemoteClientResult<RemotePullRequest>,
    ) {
        self.lock()
            .queued
            .entry((repository.clone(), number))
            .or_default()
            .push_back(response);
    }

    /// Returns how many times a pull request was fetched.
    #[must_use]
    pub fn calls_for(&self, repository: &RepositoryFullName, number: PullRequestNumber) -> usize {
        self.lock()
            .calls
            .get(&(repository.clone(), number))
            .copied()
            .unwrap_or_default()
    }

    /// Returns the total number of fetches across all pull requests.
    #[must_use]
    pub fn total_calls(&self) -> usize {
        self.lock().calls.values().sum()
    }

    /// Returns the highest number of fetches observed in flight at once.
    #[must_use]
    pub fn max_in_flight(&self) -> usize {
        self.lock().max_in_flight
    }

    fn lock(&self) -> MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin_call(&self, key: &ScriptKey) -> RemoteClientResult<RemotePullRequest> {
        let mut state = self.lock();
        *state.calls.entry(key.clone()).or_default() += 1;
        state.in_flight += 1;
        state.max_in_flight = state.max_in_flight.max(state.in_flight);

        let queued = state.queued.get_mut(key).and_then(VecDeque::pop_front);
        queued
            .or_else(|| state.standing.get(key).cloned())
            .unwrap_or_else(|| {
                Err(RemoteClientError::NotFound {
                    repository: key.0.clone(),
                    number: key.1,
                })
            })
    }
}

/// Decrements the in-flight gauge even when the fetch future is dropped.
struct InFlightGuard<'a> {
    client: &'a ScriptedRemoteClient,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.client.lock();
        state.in_flight = state.in_flight.saturating_sub(1);
    }
}

#[async_trait]
impl RemotePullRequestClient for ScriptedRemoteClient {
    async fn fetch_pull_request(
        &self,
        repository: &RepositoryFullName,
        number: PullRequestNumber,
    ) -> RemoteClientResult<RemotePullRequest> {
        let key = (repository.clone(), number);
        let response = self.begin_call(&key);
        let _guard = InFlightGuard { client: self };
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        response
    }
}
