//! Pull request status reconciliation.
//!
//! Two paths keep stored pull requests in step with the remote service:
//!
//! - [`monitor::PrMonitor`] runs one polling session per open pull request.
//! - [`worker::PrSyncWorker`] sweeps every tracked pull request on a fixed
//!   interval with bounded concurrency.
//!
//! Both compute changes with [`reconciliation::reconcile`] and persist them
//! through [`executor::ReconciliationExecutor`]. The paths may observe the
//! same transition at the same time; guarded writes make sure only one of
//! them persists it and fires its side effects.

pub mod adapters;
pub mod config;
pub mod error;
pub mod executor;
pub mod fetch;
pub mod monitor;
pub mod ports;
pub mod reconciliation;
pub mod worker;

#[cfg(test)]
mod tests;
