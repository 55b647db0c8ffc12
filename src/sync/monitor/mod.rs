//! Real-time monitoring: one polling session per open pull request.

mod registry;
mod service;
mod session;

pub use service::{MonitorError, MonitorResult, PrMonitor};
pub use session::{SessionSnapshot, SessionTermination};
