//! Pull request status and its legal transitions.

use super::ParsePullRequestStatusError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Open/closed state as reported by the code-hosting service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemotePullRequestState {
    /// The pull request accepts further changes.
    Open,
    /// The pull request was closed, with or without a merge.
    Closed,
}

/// Locally tracked pull request status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PullRequestStatus {
    /// Awaiting review or merge.
    Open,
    /// Merged into its base branch.
    Merged,
    /// Closed without a merge.
    Closed,
}

impl PullRequestStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Merged => "merged",
            Self::Closed => "closed",
        }
    }

    /// Derives the local status from the remote state and merged flag.
    ///
    /// The merged flag wins over the state so that a merged pull request is
    /// never recorded as merely closed.
    #[must_use]
    pub const fn from_remote(state: RemotePullRequestState, merged: bool) -> Self {
        match (state, merged) {
            (_, true) => Self::Merged,
            (RemotePullRequestState::Closed, false) => Self::Closed,
            (RemotePullRequestState::Open, false) => Self::Open,
        }
    }

    /// Returns `true` for statuses with no outgoing transition.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Merged | Self::Closed)
    }

    /// Returns `true` when moving from `self` to `target` is legal.
    ///
    /// Only `Open` may change, and only to a terminal status.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Open, Self::Merged | Self::Closed)
        )
    }
}

impl fmt::Display for PullRequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for PullRequestStatus {
    type Error = ParsePullRequestStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "merged" => Ok(Self::Merged),
            "closed" => Ok(Self::Closed),
            _ => Err(ParsePullRequestStatusError(value.to_owned())),
        }
    }
}
