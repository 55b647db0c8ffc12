//! In-memory pull request adapters.

mod remote;
mod repository;

pub use remote::ScriptedRemoteClient;
pub use repository::InMemoryPullRequestRepository;
