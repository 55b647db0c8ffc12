//! Periodic batch path: reconciles every tracked pull request each cycle.

mod service;
mod stats;

pub use service::{PrSyncWorker, SyncWorkerError, SyncWorkerResult};
pub use stats::{CycleSummary, SyncResult, SyncWorkerStats};
