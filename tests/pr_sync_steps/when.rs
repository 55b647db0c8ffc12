//! When steps for pull request reconciliation BDD scenarios.

use std::time::Duration;

use super::world::{SyncWorld, run_async};
use eyre::WrapErr;
use pr_reconciler::{
    pull_request::domain::PullRequest,
    sync::{monitor::PrMonitor, worker::PrSyncWorker},
};
use rstest_bdd_macros::when;

async fn watch_until_session_ends(
    monitor: &PrMonitor,
    pull_request: PullRequest,
) -> Result<(), eyre::Report> {
    let pull_request_id = pull_request.id();
    monitor
        .monitor_pull_request(pull_request)
        .await
        .wrap_err("start monitoring session")?;
    for _ in 0..500 {
        if !monitor.is_monitoring(pull_request_id) {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    Err(eyre::eyre!("monitoring session for {pull_request_id} did not end"))
}

#[when("the sync worker runs one cycle")]
fn worker_runs_one_cycle(world: &mut SyncWorld) -> Result<(), eyre::Report> {
    let worker = PrSyncWorker::new(world.ports(), world.worker_config.clone());
    run_async(worker.sync_once()).wrap_err("run sync cycle")?;
    Ok(())
}

#[when("the monitor watches pull request #{number:u64} until its session ends")]
fn monitor_watches(world: &mut SyncWorld, number: u64) -> Result<(), eyre::Report> {
    let (pull_request, _) = world.seeded(number)?.clone();
    let monitor = world.new_monitor();
    run_async(watch_until_session_ends(&monitor, pull_request))?;
    world.monitor = Some(monitor);
    Ok(())
}
