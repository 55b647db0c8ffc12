//! Then steps for pull request reconciliation BDD scenarios.

use super::world::{SyncWorld, run_async};
use pr_reconciler::{
    sync::ports::{EntityType, ProjectMessageType},
    task::{domain::TaskStatus, ports::TaskRepository},
};
use rstest_bdd_macros::then;

#[then(r#"the task status is "{status}""#)]
fn task_status_is(world: &SyncWorld, status: String) -> Result<(), eyre::Report> {
    let expected = TaskStatus::try_from(status.as_str())
        .map_err(|err| eyre::eyre!("invalid expected status in scenario: {err}"))?;
    let task = world
        .last_task
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing scenario task"))?;
    let stored = run_async(world.tasks.find_by_id(task.id()))?
        .ok_or_else(|| eyre::eyre!("task {} disappeared", task.id()))?;

    if stored.status() != expected {
        return Err(eyre::eyre!(
            "expected task status {}, found {}",
            expected.as_str(),
            stored.status().as_str()
        ));
    }
    Ok(())
}

#[then("the status notification count is {count:usize}")]
fn status_notification_count(world: &SyncWorld, count: usize) -> Result<(), eyre::Report> {
    let seen = world.notifier.status_changes(EntityType::Task).len()
        + world.notifier.status_changes(EntityType::PullRequest).len();
    eyre::ensure!(seen == count, "expected {count} status notifications, saw {seen}");
    Ok(())
}

#[then("the worktree cleanup count is {count:usize}")]
fn worktree_cleanup_count(world: &SyncWorld, count: usize) -> Result<(), eyre::Report> {
    let seen = world.worktrees.cleanups().len();
    eyre::ensure!(seen == count, "expected {count} cleanups, saw {seen}");
    Ok(())
}

#[then("the merge notification count is {count:usize}")]
fn merge_notification_count(world: &SyncWorld, count: usize) -> Result<(), eyre::Report> {
    let seen = world
        .notifier
        .project_message_count(ProjectMessageType::PullRequestMerged);
    eyre::ensure!(seen == count, "expected {count} merge notifications, saw {seen}");
    Ok(())
}

#[then("pull request #{number:u64} is no longer monitored")]
fn no_longer_monitored(world: &SyncWorld, number: u64) -> Result<(), eyre::Report> {
    let (pull_request, _) = world.seeded(number)?;
    let monitor = world
        .monitor
        .as_ref()
        .ok_or_else(|| eyre::eyre!("no monitor in scenario"))?;
    eyre::ensure!(
        !monitor.is_monitoring(pull_request.id()),
        "pull request #{number} is still monitored"
    );
    Ok(())
}

#[then("the remote fetch count is {count:usize}")]
fn remote_fetch_count(world: &SyncWorld, count: usize) -> Result<(), eyre::Report> {
    let seen = world.remote.total_calls();
    eyre::ensure!(seen == count, "expected {count} fetches, saw {seen}");
    Ok(())
}

#[then("at most {limit:usize} fetches were in flight at once")]
fn bounded_in_flight(world: &SyncWorld, limit: usize) -> Result<(), eyre::Report> {
    let seen = world.remote.max_in_flight();
    eyre::ensure!(seen <= limit, "expected at most {limit} in flight, saw {seen}");
    Ok(())
}
