//! Port for reading pull request state from the code-hosting service.

use crate::pull_request::domain::{PullRequestNumber, RemotePullRequest, RepositoryFullName};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Result type for remote pull request lookups.
pub type RemoteClientResult<T> = Result<T, RemoteClientError>;

/// Read access to pull requests hosted by the remote service.
///
/// Implementations own transport, authentication, and pagination. Calls are
/// subject to the service's rate limit.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemotePullRequestClient: Send + Sync {
    /// Fetches the current state of one pull request.
    async fn fetch_pull_request(
        &self,
        repository: &RepositoryFullName,
        number: PullRequestNumber,
    ) -> RemoteClientResult<RemotePullRequest>;
}

/// Errors returned by remote pull request clients.
#[derive(Debug, Clone, Error)]
pub enum RemoteClientError {
    /// The service rejected the call because the rate limit is exhausted.
    #[error("rate limited by remote service")]
    RateLimited {
        /// Wait suggested by the service, when it sent one.
        retry_after: Option<Duration>,
    },

    /// The pull request does not exist.
    #[error("pull request {repository}{number} not found")]
    NotFound {
        /// Repository slug.
        repository: RepositoryFullName,
        /// Pull request number.
        number: PullRequestNumber,
    },

    /// Credentials do not grant access to the pull request.
    #[error("access denied: {0}")]
    Forbidden(String),

    /// The call did not complete within its deadline.
    #[error("remote call timed out after {0:?}")]
    Timeout(Duration),

    /// Network or protocol failure.
    #[error("transport error: {0}")]
    Transport(Arc<dyn std::error::Error + Send + Sync>),
}

impl RemoteClientError {
    /// Wraps a transport error.
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport(Arc::new(err))
    }

    /// Returns `true` when repeating the call may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::Timeout(_) | Self::Transport(_)
        )
    }

    /// Returns the wait the service asked for, if any.
    #[must_use]
    pub const fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}
