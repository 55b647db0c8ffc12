//! Monitor and worker racing on the same pull request transition.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use pr_reconciler::{
    sync::{
        config::{MonitorConfig, SyncWorkerConfig},
        monitor::PrMonitor,
        ports::{EntityType, ProjectMessageType},
        worker::PrSyncWorker,
    },
    task::domain::TaskStatus,
};
use rstest::rstest;

use super::helpers::{SyncFixture, remote_open, wait_until};

#[rstest]
#[case(1)]
#[case(5)]
#[case(12)]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn merge_side_effects_fire_once_when_both_paths_observe_it(
    #[case] number: u64,
) -> Result<(), eyre::Report> {
    let fixture = SyncFixture::with_latency(Duration::from_millis(5));
    let (pull_request, task) = fixture.seed(number, TaskStatus::CodeReviewing).await?;
    fixture.respond(number, Ok(remote_open(number)?.merged("abc123", "octocat", Utc::now())))?;

    let monitor = PrMonitor::new(fixture.ports(), MonitorConfig::default());
    let worker = PrSyncWorker::with_monitoring(
        fixture.ports(),
        SyncWorkerConfig::default(),
        Arc::new(monitor.clone()),
    );

    let (monitored, synced) = tokio::join!(
        monitor.monitor_pull_request(pull_request.clone()),
        worker.sync_once(),
    );
    monitored?;
    synced?;
    wait_until(|| !monitor.is_monitoring(pull_request.id())).await?;

    eyre::ensure!(
        fixture.task_status(&task).await? == TaskStatus::Done,
        "task should be done"
    );
    eyre::ensure!(
        fixture.worktrees.cleanups().len() == 1,
        "cleanup ran {} times",
        fixture.worktrees.cleanups().len()
    );
    eyre::ensure!(
        fixture
            .notifier
            .project_message_count(ProjectMessageType::PullRequestMerged)
            == 1,
        "merge message sent more than once"
    );
    eyre::ensure!(
        fixture.notifier.status_changes(EntityType::PullRequest).len() == 1,
        "pull request status announced more than once"
    );
    eyre::ensure!(
        fixture.notifier.status_changes(EntityType::Task).len() == 1,
        "task status announced more than once"
    );
    monitor.stop().await?;
    Ok(())
}
