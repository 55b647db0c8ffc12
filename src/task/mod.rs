//! Tasks: the units of work whose status follows their pull request.
//!
//! This subsystem only reads tasks and moves their status forward; task
//! creation and planning live elsewhere. The module follows hexagonal
//! architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]

pub mod adapters;
pub mod domain;
pub mod ports;

#[cfg(test)]
mod tests;
