//! Collaborator ports driven by reconciliation side effects.

pub mod monitoring;
pub mod notification;
pub mod worktree;

pub use monitoring::MonitoringControl;
pub use notification::{
    EntityType, NotificationError, NotificationPublisher, NotificationResult, ProjectMessageType,
};
pub use worktree::{Worktree, WorktreeError, WorktreeManager, WorktreeResult};
