//! Shared test helpers for in-memory reconciliation integration tests.

use std::sync::Arc;
use std::time::Duration;

use mockable::DefaultClock;
use pr_reconciler::{
    pull_request::{
        adapters::memory::{InMemoryPullRequestRepository, ScriptedRemoteClient},
        domain::{
            NewPullRequest, PullRequest, PullRequestNumber, RemotePullRequest, RepositoryFullName,
        },
        ports::PullRequestRepository,
    },
    sync::{
        adapters::memory::{RecordingNotifier, RecordingWorktreeManager},
        executor::SyncPorts,
        ports::Worktree,
    },
    task::{
        adapters::memory::InMemoryTaskRepository,
        domain::{ProjectId, Task, TaskStatus},
        ports::TaskRepository,
    },
};

/// Repository slug used by every scenario.
pub const REPOSITORY: &str = "acme/widgets";

/// In-memory collaborators shared by the monitor and the worker.
#[derive(Clone, Default)]
pub struct SyncFixture {
    pub pull_requests: InMemoryPullRequestRepository,
    pub tasks: InMemoryTaskRepository,
    pub remote: ScriptedRemoteClient,
    pub notifier: RecordingNotifier,
    pub worktrees: RecordingWorktreeManager,
}

impl SyncFixture {
    /// Creates a fixture whose remote client delays every response.
    #[must_use]
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            remote: ScriptedRemoteClient::new().with_latency(latency),
            ..Self::default()
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

    /// Stores a task in `status` that owns an open pull request `#number`
    /// with a worktree on disk.
    ///
    /// # Errors
    ///
    /// Returns an error if any domain construction or store call fails.
    pub async fn seed(
        &self,
        number: u64,
        status: TaskStatus,
    ) -> Result<(PullRequest, Task), eyre::Report> {
        let task = Task::new(ProjectId::new(), format!("Task for #{number}"), &DefaultClock)?
            .with_status(status);
        let pull_request = PullRequest::new(
            NewPullRequest {
                task_id: task.id(),
                repository: repository()?,
                number: PullRequestNumber::new(number)?,
                head_branch: format!("feature/{number}"),
                base_branch: "main".to_owned(),
            },
            &DefaultClock,
        )?;
        self.tasks.store(&task).await?;
        self.pull_requests.store(&pull_request).await?;
        self.worktrees.add(Worktree {
            task_id: task.id(),
            path: format!("/worktrees/{number}"),
            branch: format!("feature/{number}"),
        });
        Ok((pull_request, task))
    }

    /// Scripts the standing remote response for `#number`.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository slug or number is invalid.
    pub fn respond(
        &self,
        number: u64,
        response: Result<RemotePullRequest, pr_reconciler::pull_request::ports::RemoteClientError>,
    ) -> Result<(), eyre::Report> {
        self.remote
            .set_response(&repository()?, PullRequestNumber::new(number)?, response);
        Ok(())
    }

    /// Returns how many times `#number` was fetched.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository slug or number is invalid.
    pub fn calls_for(&self, number: u64) -> Result<usize, eyre::Report> {
        Ok(self
            .remote
            .calls_for(&repository()?, PullRequestNumber::new(number)?))
    }

    /// Loads the stored status of `task`.
    ///
    /// # Errors
    ///
    /// Returns an error if the task is missing or the lookup fails.
    pub async fn task_status(&self, task: &Task) -> Result<TaskStatus, eyre::Report> {
        let stored = self
            .tasks
            .find_by_id(task.id())
            .await?
            .ok_or_else(|| eyre::eyre!("task {} missing", task.id()))?;
        Ok(stored.status())
    }
}

/// Returns the scenario repository slug.
///
/// # Errors
///
/// Returns an error if the slug is rejected.
pub fn repository() -> Result<RepositoryFullName, eyre::Report> {
    Ok(RepositoryFullName::new(REPOSITORY)?)
}

/// Builds an open remote snapshot for `#number`.
///
/// # Errors
///
/// Returns an error if the number is invalid.
pub fn remote_open(number: u64) -> Result<RemotePullRequest, eyre::Report> {
    Ok(RemotePullRequest::open(
        PullRequestNumber::new(number)?,
        format!("feature/{number}"),
        "main",
    ))
}

/// Polls `done` on paused or real time until it holds.
///
/// # Errors
///
/// Returns an error when the condition does not hold within the budget.
pub async fn wait_until(mut done: impl FnMut() -> bool) -> Result<(), eyre::Report> {
    for _ in 0..2_000 {
        if done() {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    Err(eyre::eyre!("condition not reached in time"))
}
