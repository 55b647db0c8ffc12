//! In-memory collaborator adapters that record what reconciliation asked
//! them to do.

mod notification;
mod worktree;

pub use notification::{RecordedNotification, RecordingNotifier};
pub use worktree::RecordingWorktreeManager;
