//! Error types for pull request domain validation and parsing.

use super::PullRequestStatus;
use thiserror::Error;

/// Errors returned while constructing or mutating pull request values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PullRequestDomainError {
    /// The repository name does not follow `owner/repo` format.
    #[error("invalid repository name '{0}', expected owner/repo")]
    InvalidRepository(String),

    /// The pull request number is invalid.
    #[error("invalid pull request number {0}, expected a positive integer")]
    InvalidPullRequestNumber(u64),

    /// A branch name is empty after trimming.
    #[error("branch name must not be empty")]
    EmptyBranchName,

    /// The status change leaves a terminal status or is otherwise illegal.
    #[error("invalid pull request status transition from {from} to {to}")]
    InvalidStatusTransition {
        /// Stored status.
        from: PullRequestStatus,
        /// Rejected target status.
        to: PullRequestStatus,
    },
}

/// Error returned while parsing pull request statuses from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown pull request status: {0}")]
pub struct ParsePullRequestStatusError(pub String);
