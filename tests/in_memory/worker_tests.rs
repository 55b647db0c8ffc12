//! In-memory integration tests for the periodic sync worker.

use std::time::Duration;

use chrono::Utc;
use pr_reconciler::{
    pull_request::ports::RemoteClientError,
    sync::{config::SyncWorkerConfig, worker::PrSyncWorker},
    task::domain::TaskStatus,
};
use rstest::rstest;
use tokio_util::sync::CancellationToken;

use super::helpers::{SyncFixture, remote_open, wait_until};

fn config() -> SyncWorkerConfig {
    SyncWorkerConfig::default()
        .with_sync_interval(Duration::from_secs(60))
        .with_retry_delay(Duration::from_secs(10))
        .with_retry_attempts(3)
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn five_pull_requests_in_batches_of_two_share_two_permits() -> Result<(), eyre::Report> {
    let fixture = SyncFixture::with_latency(Duration::from_millis(250));
    for number in 1..=5 {
        fixture.seed(number, TaskStatus::CodeReviewing).await?;
        fixture.respond(number, Ok(remote_open(number)?))?;
    }
    let worker = PrSyncWorker::new(
        fixture.ports(),
        config().with_batch_size(2).with_max_concurrent_syncs(2),
    );

    let summary = worker.sync_once().await?;

    eyre::ensure!(summary.synced == 5, "all five synced: {summary:?}");
    eyre::ensure!(
        fixture.remote.total_calls() == 5,
        "expected five fetches, saw {}",
        fixture.remote.total_calls()
    );
    eyre::ensure!(
        fixture.remote.max_in_flight() <= 2,
        "at most two fetches in flight, saw {}",
        fixture.remote.max_in_flight()
    );
    eyre::ensure!(
        fixture.remote.max_in_flight() == 2,
        "permits should be used in parallel"
    );
    Ok(())
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn failed_fetch_is_recorded_while_sibling_updates() -> Result<(), eyre::Report> {
    let fixture = SyncFixture::default();
    let (_, failing_task) = fixture.seed(10, TaskStatus::CodeReviewing).await?;
    let (_, closing_task) = fixture.seed(11, TaskStatus::CodeReviewing).await?;
    fixture.respond(
        10,
        Err(RemoteClientError::RateLimited {
            retry_after: Some(Duration::from_secs(15)),
        }),
    )?;
    fixture.respond(11, Ok(remote_open(11)?.closed(Utc::now())))?;
    let worker = PrSyncWorker::new(fixture.ports(), config());

    let summary = worker.sync_once().await?;

    eyre::ensure!(summary.failed == 1 && summary.synced == 1, "{summary:?}");
    eyre::ensure!(fixture.calls_for(10)? == 3, "bounded retries for the failing PR");
    eyre::ensure!(
        fixture.task_status(&closing_task).await? == TaskStatus::Cancelled,
        "closed PR cancels the task in review"
    );
    eyre::ensure!(
        fixture.task_status(&failing_task).await? == TaskStatus::CodeReviewing,
        "failed PR leaves its task untouched"
    );
    let stats = worker.get_stats();
    eyre::ensure!(stats.total_sync_failures == 1, "{stats:?}");
    eyre::ensure!(stats.total_status_changes == 1, "{stats:?}");
    Ok(())
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn running_worker_keeps_cycling_after_a_listing_failure() -> Result<(), eyre::Report> {
    let fixture = SyncFixture::default();
    fixture.seed(20, TaskStatus::Implementing).await?;
    fixture.respond(20, Ok(remote_open(20)?))?;
    fixture.pull_requests.set_listing_failure(true)?;
    let worker = PrSyncWorker::new(fixture.ports(), config());
    let shutdown = CancellationToken::new();

    worker.start(&shutdown)?;
    wait_until(|| worker.get_stats().error_count == 1).await?;
    fixture.pull_requests.set_listing_failure(false)?;
    worker.force_sync()?;
    wait_until(|| worker.get_stats().cycle_count == 1).await?;

    let stats = worker.get_stats();
    eyre::ensure!(stats.running, "worker keeps running");
    eyre::ensure!(stats.error_count == 1, "{stats:?}");
    eyre::ensure!(stats.last_cycle_status_changes == 1, "{stats:?}");
    worker.stop().await?;
    eyre::ensure!(!worker.get_stats().running, "stopped");
    Ok(())
}
