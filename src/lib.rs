//! Pull request status reconciliation for task orchestration.
//!
//! This crate keeps locally stored pull requests consistent with the remote
//! code-hosting service and moves the owning tasks through their workflow
//! when a pull request opens, merges, or closes.
//!
//! # Architecture
//!
//! Each bounded context follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for external interactions
//! - **Adapters**: Concrete implementations of ports
//!
//! # Modules
//!
//! - [`task`]: Task aggregate and workflow statuses
//! - [`pull_request`]: Pull request aggregate, remote snapshots, and ports
//! - [`sync`]: Reconciliation, the real-time monitor, and the batch worker

pub mod pull_request;
pub mod sync;
pub mod task;
