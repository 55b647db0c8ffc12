//! Notification publisher that keeps every delivered message in memory.

use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

use crate::sync::ports::{
    EntityType, NotificationError, NotificationPublisher, NotificationResult, ProjectMessageType,
};
use crate::task::domain::ProjectId;

/// A notification captured by [`RecordingNotifier`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedNotification {
    /// A project-scoped message.
    ProjectMessage {
        /// Target project.
        project_id: ProjectId,
        /// Message kind.
        message_type: ProjectMessageType,
        /// JSON payload.
        payload: serde_json::Value,
    },
    /// A status-change announcement.
    StatusChanged {
        /// Entity that changed.
        entity_id: Uuid,
        /// Owning project.
        project_id: ProjectId,
        /// Entity kind.
        entity_type: EntityType,
        /// Previous status.
        old_status: String,
        /// New status.
        new_status: String,
    },
}

/// Thread-safe recording notification publisher.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    state: Arc<Mutex<NotifierState>>,
}

#[derive(Debug, Default)]
struct NotifierState {
    delivered: Vec<RecordedNotification>,
    failing: bool,
}

impl RecordingNotifier {
    /// Creates an empty notifier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent delivery fail while `failing` is `true`.
    pub fn set_failing(&self, failing: bool) {
        self.lock().failing = failing;
    }

    /// Returns every delivered notification in delivery order.
    #[must_use]
    pub fn delivered(&self) -> Vec<RecordedNotification> {
        self.lock().delivered.clone()
    }

    /// Returns status-change notifications for one entity kind.
    #[must_use]
    pub fn status_changes(&self, entity_type: EntityType) -> Vec<RecordedNotification> {
        self.lock()
            .delivered
            .iter()
            .filter(|notification| {
                matches!(
                    notification,
                    RecordedNotification::StatusChanged { entity_type: kind, .. } if *kind == entity_type
                )
            })
            .cloned()
            .collect()
    }

    /// Returns the number of project messages of one kind.
    #[must_use]
    pub fn project_message_count(&self, message_type: ProjectMessageType) -> usize {
        self.lock()
            .delivered
            .iter()
            .filter(|notification| {
                matches!(
                    notification,
                    RecordedNotification::ProjectMessage { message_type: kind, .. } if *kind == message_type
                )
            })
            .count()
    }

    fn lock(&self) -> MutexGuard<'_, NotifierState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, notification: RecordedNotification) -> NotificationResult<()> {
        let mut state = self.lock();
        if state.failing {
            return Err(NotificationError::delivery(std::io::Error::other(
                "notifier unavailable",
            )));
        }
        state.delivered.push(notification);
        Ok(())
    }
}

#[async_trait]
impl NotificationPublisher for RecordingNotifier {
    async fn send_project_message(
        &self,
        project_id: ProjectId,
        message_type: ProjectMessageType,
        payload: serde_json::Value,
    ) -> NotificationResult<()> {
        self.record(RecordedNotification::ProjectMessage {
            project_id,
            message_type,
            payload,
        })
    }

    async fn notify_status_changed(
        &self,
        entity_id: Uuid,
        project_id: ProjectId,
        entity_type: EntityType,
        old_status: &str,
        new_status: &str,
    ) -> NotificationResult<()> {
        self.record(RecordedNotification::StatusChanged {
            entity_id,
            project_id,
            entity_type,
            old_status: old_status.to_owned(),
            new_status: new_status.to_owned(),
        })
    }
}
