//! Given steps for pull request reconciliation BDD scenarios.

use super::world::{REPOSITORY, SyncWorld, coordinates, run_async};
use chrono::Utc;
use eyre::WrapErr;
use mockable::DefaultClock;
use pr_reconciler::{
    pull_request::{
        domain::{NewPullRequest, PullRequest, RemotePullRequest, RepositoryFullName},
        ports::PullRequestRepository,
    },
    sync::ports::Worktree,
    task::{
        domain::{ProjectId, Task, TaskStatus},
        ports::TaskRepository,
    },
};
use rstest_bdd_macros::given;

fn seed(world: &mut SyncWorld, number: u64, status: TaskStatus) -> Result<Task, eyre::Report> {
    let (_, pr_number) = coordinates(number)?;
    let task = Task::new(ProjectId::new(), format!("Task for #{number}"), &DefaultClock)?
        .with_status(status);
    let pull_request = PullRequest::new(
        NewPullRequest {
            task_id: task.id(),
            repository: RepositoryFullName::new(REPOSITORY)?,
            number: pr_number,
            head_branch: format!("feature/{number}"),
            base_branch: "main".to_owned(),
        },
        &DefaultClock,
    )?;
    run_async(world.tasks.store(&task)).wrap_err("store scenario task")?;
    run_async(world.pull_requests.store(&pull_request)).wrap_err("store scenario pull request")?;
    world.worktrees.add(Worktree {
        task_id: task.id(),
        path: format!("/worktrees/{number}"),
        branch: format!("feature/{number}"),
    });
    world.seeded.insert(number, (pull_request, task.clone()));
    Ok(task)
}

#[given(r#"a task in status "{status}" owning pull request #{number:u64}"#)]
fn task_owning_pull_request(
    world: &mut SyncWorld,
    status: String,
    number: u64,
) -> Result<(), eyre::Report> {
    let task_status = TaskStatus::try_from(status.as_str())
        .map_err(|err| eyre::eyre!("invalid task status in scenario: {err}"))?;
    let task = seed(world, number, task_status)?;
    world.last_task = Some(task);
    Ok(())
}

#[given(r#"the remote reports pull request #{number:u64} as "{state}""#)]
fn remote_reports(world: &mut SyncWorld, number: u64, state: String) -> Result<(), eyre::Report> {
    let (repository, pr_number) = coordinates(number)?;
    let open = RemotePullRequest::open(pr_number, format!("feature/{number}"), "main");
    let snapshot = match state.as_str() {
        "open" => open,
        "merged" => open.merged("abc123", "octocat", Utc::now()),
        "closed" => open.closed(Utc::now()),
        other => return Err(eyre::eyre!("unknown remote state {other}")),
    };
    world.remote.set_response(&repository, pr_number, Ok(snapshot));
    Ok(())
}

#[given("{count:u64} open pull requests owned by tasks in code review")]
fn open_pull_requests(world: &mut SyncWorld, count: u64) -> Result<(), eyre::Report> {
    for number in 1..=count {
        seed(world, number, TaskStatus::CodeReviewing)?;
        let (repository, pr_number) = coordinates(number)?;
        world.remote.set_response(
            &repository,
            pr_number,
            Ok(RemotePullRequest::open(
                pr_number,
                format!("feature/{number}"),
                "main",
            )),
        );
    }
    Ok(())
}

#[given("the sync worker uses batches of {batch_size:usize} with {max_concurrent:usize} concurrent syncs")]
fn worker_limits(world: &mut SyncWorld, batch_size: usize, max_concurrent: usize) {
    world.worker_config = world
        .worker_config
        .clone()
        .with_batch_size(batch_size)
        .with_max_concurrent_syncs(max_concurrent);
}
