//! Adapter implementations for sync collaborator ports.

pub mod memory;
