//! Port for delivering status events to project subscribers.

use crate::task::domain::ProjectId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Result type for notification delivery.
pub type NotificationResult<T> = Result<T, NotificationError>;

/// Kind of entity a status-change notification refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    /// A task.
    Task,
    /// A pull request.
    PullRequest,
}

impl EntityType {
    /// Returns the wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Task => "task",
            Self::PullRequest => "pull_request",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Project-scoped message kinds emitted by reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectMessageType {
    /// A pull request was merged and its task completed.
    PullRequestMerged,
}

impl ProjectMessageType {
    /// Returns the wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PullRequestMerged => "pull_request_merged",
        }
    }
}

/// Event delivery contract.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationPublisher: Send + Sync {
    /// Sends a typed message to every subscriber of a project.
    async fn send_project_message(
        &self,
        project_id: ProjectId,
        message_type: ProjectMessageType,
        payload: serde_json::Value,
    ) -> NotificationResult<()>;

    /// Announces that an entity moved between statuses.
    async fn notify_status_changed(
        &self,
        entity_id: Uuid,
        project_id: ProjectId,
        entity_type: EntityType,
        old_status: &str,
        new_status: &str,
    ) -> NotificationResult<()>;
}

/// Errors returned by notification adapters.
#[derive(Debug, Clone, Error)]
pub enum NotificationError {
    /// The message could not be delivered.
    #[error("notification delivery failed: {0}")]
    Delivery(Arc<dyn std::error::Error + Send + Sync>),
}

impl NotificationError {
    /// Wraps a delivery error.
    pub fn delivery(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Delivery(Arc::new(err))
    }
}
