//! Domain model for tasks whose lifecycle is partly driven by pull requests.
//!
//! Only the parts of a task that pull request reconciliation reads or writes
//! live here: identity, owning project, and workflow status.

mod error;
mod ids;
mod task;

pub use error::{ParseTaskStatusError, TaskDomainError};
pub use ids::{ProjectId, TaskId};
pub use task::{Task, TaskStatus};
