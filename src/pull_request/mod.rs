//! Pull requests tracked on behalf of tasks.
//!
//! The local record mirrors a pull request hosted by a remote code-hosting
//! service. The module follows hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`], including the remote client capability
//! - Adapter implementations in [`adapters`]

pub mod adapters;
pub mod domain;
pub mod ports;

#[cfg(test)]
mod tests;
