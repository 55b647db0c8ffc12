//! Port contracts for pull request persistence and remote lookup.

pub mod remote;
pub mod repository;

pub use remote::{RemoteClientError, RemoteClientResult, RemotePullRequestClient};
pub use repository::{
    PullRequestRepository, PullRequestRepositoryError, PullRequestRepositoryResult,
};
