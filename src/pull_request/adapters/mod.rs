//! Adapter implementations for pull request ports.

pub mod memory;
