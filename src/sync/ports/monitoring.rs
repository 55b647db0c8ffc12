//! Port through which the batch worker ends real-time monitoring sessions.

use crate::pull_request::domain::PullRequestId;

/// Ends monitoring for pull requests that reached a terminal status.
#[cfg_attr(test, mockall::automock)]
pub trait MonitoringControl: Send + Sync {
    /// Ends the session for `pull_request_id`.
    ///
    /// Returns `true` when a session existed and was ended.
    fn end_session(&self, pull_request_id: PullRequestId) -> bool;
}
