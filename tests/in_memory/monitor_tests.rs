//! In-memory integration tests for the real-time monitor.

use std::time::Duration;

use chrono::Utc;
use pr_reconciler::{
    pull_request::{domain::PullRequestStatus, ports::RemoteClientError},
    sync::{
        config::MonitorConfig,
        monitor::{PrMonitor, SessionTermination},
        ports::{EntityType, ProjectMessageType},
    },
    task::domain::TaskStatus,
};
use rstest::{fixture, rstest};

use super::helpers::{SyncFixture, remote_open, wait_until};

#[fixture]
fn fixture() -> SyncFixture {
    SyncFixture::default()
}

fn config() -> MonitorConfig {
    MonitorConfig::default()
        .with_poll_interval(Duration::from_secs(300))
        .with_retry_delay(Duration::from_secs(30))
        .with_max_retries(3)
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn open_pull_request_moves_task_into_review(
    fixture: SyncFixture,
) -> Result<(), eyre::Report> {
    let (pull_request, task) = fixture.seed(123, TaskStatus::Todo).await?;
    fixture.respond(123, Ok(remote_open(123)?))?;
    let monitor = PrMonitor::new(fixture.ports(), config());

    monitor.monitor_pull_request(pull_request.clone()).await?;
    wait_until(|| fixture.notifier.delivered().len() == 1).await?;

    eyre::ensure!(
        fixture.task_status(&task).await? == TaskStatus::CodeReviewing,
        "task should be in code review"
    );
    eyre::ensure!(
        fixture.notifier.status_changes(EntityType::Task).len() == 1,
        "expected one task notification"
    );
    eyre::ensure!(fixture.worktrees.cleanups().is_empty(), "no cleanup expected");
    eyre::ensure!(
        monitor.is_monitoring(pull_request.id()),
        "open pull request stays monitored"
    );
    monitor.stop().await?;
    Ok(())
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn merge_observed_by_monitor_cleans_up_once(
    fixture: SyncFixture,
) -> Result<(), eyre::Report> {
    let (pull_request, task) = fixture.seed(123, TaskStatus::CodeReviewing).await?;
    fixture.respond(123, Ok(remote_open(123)?.merged("abc123", "octocat", Utc::now())))?;
    let monitor = PrMonitor::new(fixture.ports(), config());

    monitor.monitor_pull_request(pull_request.clone()).await?;
    wait_until(|| !monitor.is_monitoring(pull_request.id())).await?;
    tokio::time::sleep(Duration::from_secs(900)).await;

    eyre::ensure!(
        fixture.task_status(&task).await? == TaskStatus::Done,
        "task should be done"
    );
    eyre::ensure!(fixture.worktrees.cleanups().len() == 1, "exactly one cleanup");
    eyre::ensure!(
        fixture
            .notifier
            .project_message_count(ProjectMessageType::PullRequestMerged)
            == 1,
        "exactly one merge notification"
    );
    eyre::ensure!(fixture.calls_for(123)? == 1, "no polling after completion");
    eyre::ensure!(
        matches!(
            monitor.last_termination(pull_request.id()),
            Some(SessionTermination::Completed {
                status: PullRequestStatus::Merged
            })
        ),
        "session should complete on merge"
    );
    Ok(())
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn failing_session_is_abandoned_after_the_retry_bound(
    fixture: SyncFixture,
) -> Result<(), eyre::Report> {
    let (failing, _) = fixture.seed(1, TaskStatus::CodeReviewing).await?;
    let (healthy, _) = fixture.seed(2, TaskStatus::CodeReviewing).await?;
    fixture.respond(1, Err(RemoteClientError::Timeout(Duration::from_secs(30))))?;
    fixture.respond(2, Ok(remote_open(2)?))?;
    let monitor = PrMonitor::new(fixture.ports(), config());

    let started = monitor.start_monitoring().await?;
    wait_until(|| !monitor.is_monitoring(failing.id())).await?;
    tokio::time::sleep(Duration::from_secs(3_600)).await;

    eyre::ensure!(started == 2, "expected two sessions, started {started}");
    eyre::ensure!(fixture.calls_for(1)? == 3, "abandoned after three fetches");
    eyre::ensure!(
        monitor.is_monitoring(healthy.id()),
        "sibling session keeps running"
    );
    eyre::ensure!(
        matches!(
            monitor.last_termination(failing.id()),
            Some(SessionTermination::RetriesExhausted { attempts: 3, .. })
        ),
        "expected retries exhausted"
    );
    monitor.stop().await?;
    Ok(())
}
