//! Domain model for tracked pull requests.
//!
//! A pull request is owned by exactly one task. Its status moves one way,
//! from open to either merged or closed, and the remote code-hosting service
//! is the authority on which of those it is.

mod error;
mod ids;
mod pull_request;
mod remote;
mod status;

pub use error::{ParsePullRequestStatusError, PullRequestDomainError};
pub use ids::{PullRequestId, PullRequestNumber, RepositoryFullName};
pub use pull_request::{MergeMetadata, NewPullRequest, PullRequest};
pub use remote::RemotePullRequest;
pub use status::{PullRequestStatus, RemotePullRequestState};
