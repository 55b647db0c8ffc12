//! Lock-guarded registry of active monitoring sessions.

use super::session::{SessionHandle, SessionTermination};
use crate::pull_request::domain::PullRequestId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Number of ended sessions whose termination stays queryable.
pub(crate) const TERMINATION_HISTORY: usize = 1_024;

/// Active sessions plus the most recent termination per pull request.
///
/// Terminations are kept for the [`TERMINATION_HISTORY`] most recently
/// ended sessions; older entries are evicted first.
#[derive(Debug, Default)]
pub(crate) struct SessionRegistry {
    state: Mutex<RegistryState>,
}

#[derive(Debug, Default)]
struct RegistryState {
    active: HashMap<PullRequestId, Arc<SessionHandle>>,
    terminations: HashMap<PullRequestId, RecordedTermination>,
    next_sequence: u64,
}

#[derive(Debug)]
struct RecordedTermination {
    sequence: u64,
    termination: SessionTermination,
}

impl RegistryState {
    fn record(&mut self, id: PullRequestId, termination: SessionTermination) {
        self.next_sequence = self.next_sequence.wrapping_add(1);
        self.terminations.insert(
            id,
            RecordedTermination {
                sequence: self.next_sequence,
                termination,
            },
        );
        if self.terminations.len() <= TERMINATION_HISTORY {
            return;
        }
        let oldest = self
            .terminations
            .iter()
            .min_by_key(|(_, recorded)| recorded.sequence)
            .map(|(oldest, _)| *oldest);
        if let Some(oldest) = oldest {
            self.terminations.remove(&oldest);
        }
    }
}

impl SessionRegistry {
    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a session unless one is already active.
    ///
    /// Returns `false` when a session for `id` already exists.
    pub(crate) fn try_insert(&self, id: PullRequestId, handle: Arc<SessionHandle>) -> bool {
        let mut state = self.lock();
        if state.active.contains_key(&id) {
            return false;
        }
        state.terminations.remove(&id);
        state.active.insert(id, handle);
        true
    }

    pub(crate) fn contains(&self, id: PullRequestId) -> bool {
        self.lock().active.contains_key(&id)
    }

    pub(crate) fn get(&self, id: PullRequestId) -> Option<Arc<SessionHandle>> {
        self.lock().active.get(&id).cloned()
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().active.len()
    }

    /// Removes an active session and records why it ended.
    pub(crate) fn remove(
        &self,
        id: PullRequestId,
        termination: SessionTermination,
    ) -> Option<Arc<SessionHandle>> {
        let mut state = self.lock();
        let handle = state.active.remove(&id)?;
        state.record(id, termination);
        Some(handle)
    }

    /// Removes `handle` if it is still the active session for `id`.
    ///
    /// Returns `false` when the session had already been removed, for
    /// example by an explicit stop.
    pub(crate) fn finish(
        &self,
        id: PullRequestId,
        handle: &Arc<SessionHandle>,
        termination: SessionTermination,
    ) -> bool {
        let mut state = self.lock();
        let is_current = state
            .active
            .get(&id)
            .is_some_and(|active| Arc::ptr_eq(active, handle));
        if !is_current {
            return false;
        }
        state.active.remove(&id);
        state.record(id, termination);
        true
    }

    /// Removes every active session, recording each as stopped.
    pub(crate) fn drain(&self) -> Vec<Arc<SessionHandle>> {
        let mut state = self.lock();
        let drained: Vec<(PullRequestId, Arc<SessionHandle>)> = state.active.drain().collect();
        drained
            .into_iter()
            .map(|(id, handle)| {
                state.record(id, SessionTermination::Stopped);
                handle
            })
            .collect()
    }

    pub(crate) fn termination(&self, id: PullRequestId) -> Option<SessionTermination> {
        self.lock()
            .terminations
            .get(&id)
            .map(|recorded| recorded.termination.clone())
    }

    #[cfg(test)]
    fn termination_count(&self) -> usize {
        self.lock().terminations.len()
    }
}
