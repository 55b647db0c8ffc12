//! Shared world state for pull request reconciliation BDD scenarios.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use mockable::DefaultClock;
use pr_reconciler::{
    pull_request::{
        adapters::memory::{InMemoryPullRequestRepository, ScriptedRemoteClient},
        domain::{PullRequest, PullRequestNumber, RepositoryFullName},
    },
    sync::{
        adapters::memory::{RecordingNotifier, RecordingWorktreeManager},
        config::{MonitorConfig, SyncWorkerConfig},
        executor::SyncPorts,
        monitor::PrMonitor,
    },
    task::{adapters::memory::InMemoryTaskRepository, domain::Task},
};
use rstest::fixture;

/// Repository slug used by every scenario.
pub const REPOSITORY: &str = "acme/widgets";

/// Scenario world for reconciliation behaviour tests.
pub struct SyncWorld {
    pub pull_requests: InMemoryPullRequestRepository,
    pub tasks: InMemoryTaskRepository,
    pub remote: ScriptedRemoteClient,
    pub notifier: RecordingNotifier,
    pub worktrees: RecordingWorktreeManager,
    pub worker_config: SyncWorkerConfig,
    pub monitor: Option<PrMonitor>,
    pub seeded: HashMap<u64, (PullRequest, Task)>,
    pub last_task: Option<Task>,
}

impl SyncWorld {
    /// Creates a world with empty collaborators.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pull_requests: InMemoryPullRequestRepository::new(),
            tasks: InMemoryTaskRepository::new(),
            remote: ScriptedRemoteClient::new().with_latency(Duration::from_millis(20)),
            notifier: RecordingNotifier::new(),
            worktrees: RecordingWorktreeManager::new(),
            worker_config: SyncWorkerConfig::default(),
            monitor: None,
            seeded: HashMap::new(),
            last_task: None,
        }
    }

    /// Bundles the collaborators for the sync services.
    #[must_use]
    pub fn ports(&self) -> SyncPorts {
        SyncPorts {
            pull_requests: Arc::new(self.pull_requests.clone()),
            tasks: Arc::new(self.tasks.clone()),
            remote: Arc::new(self.remote.clone()),
            notifier: Arc::new(self.notifier.clone()),
            worktrees: Arc::new(self.worktrees.clone()),
            clock: Arc::new(DefaultClock),
        }
    }

    /// Creates a monitor sharing this world's collaborators.
    #[must_use]
    pub fn new_monitor(&self) -> PrMonitor {
        PrMonitor::new(self.ports(), MonitorConfig::default())
    }

    /// Returns the seeded pull request and task for `#number`.
    ///
    /// # Errors
    ///
    /// Returns an error when no pull request with that number was seeded.
    pub fn seeded(&self, number: u64) -> Result<&(PullRequest, Task), eyre::Report> {
        self.seeded
            .get(&number)
            .ok_or_else(|| eyre::eyre!("pull request #{number} was not seeded"))
    }
}

impl Default for SyncWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> SyncWorld {
    SyncWorld::default()
}

/// Returns the scenario repository slug and a validated number.
///
/// # Errors
///
/// Returns an error if either value is rejected.
pub fn coordinates(number: u64) -> Result<(RepositoryFullName, PullRequestNumber), eyre::Report> {
    Ok((
        RepositoryFullName::new(REPOSITORY)?,
        PullRequestNumber::new(number)?,
    ))
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
