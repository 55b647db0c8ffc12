//! Tests for the in-memory pull request repository.

use crate::pull_request::{
    adapters::memory::InMemoryPullRequestRepository,
    domain::{
        NewPullRequest, PullRequest, PullRequestNumber, PullRequestStatus, RemotePullRequest,
        RepositoryFullName,
    },
    ports::{PullRequestRepository, PullRequestRepositoryError},
};
use crate::task::domain::TaskId;
use chrono::Utc;
use mockable::DefaultClock;
use rstest::rstest;

fn open_pull_request(number: u64) -> PullRequest {
    PullRequest::new(
        NewPullRequest {
            task_id: TaskId::new(),
            repository: RepositoryFullName::new("owner/repo").expect("valid repository"),
            number: PullRequestNumber::new(number).expect("valid number"),
            head_branch: format!("feature/{number}"),
            base_branch: "main".to_owned(),
        },
        &DefaultClock,
    )
    .expect("valid pull request")
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn update_if_status_only_lets_the_first_writer_win() {
    let repository = InMemoryPullRequestRepository::new();
    let stored = open_pull_request(1);
    repository.store(&stored).await.expect("store");

    let mut merged = stored.clone();
    merged
        .transition_to(PullRequestStatus::Merged, Utc::now())
        .expect("legal transition");

    let first = repository
        .update_if_status(&merged, PullRequestStatus::Open)
        .await
        .expect("first write");
    let second = repository
        .update_if_status(&merged, PullRequestStatus::Open)
        .await
        .expect("second write");

    assert!(first);
    assert!(!second);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn list_actively_monitored_returns_only_open_pull_requests() {
    let repository = InMemoryPullRequestRepository::new();
    let open = open_pull_request(1);
    let closed = open_pull_request(2).with_status(PullRequestStatus::Closed);
    repository.store(&open).await.expect("store open");
    repository.store(&closed).await.expect("store closed");

    let active = repository
        .list_actively_monitored()
        .await
        .expect("listing");

    assert_eq!(active, vec![open]);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn find_by_task_id_resolves_the_owned_pull_request() {
    let repository = InMemoryPullRequestRepository::new();
    let stored = open_pull_request(7);
    repository.store(&stored).await.expect("store");

    let found = repository
        .find_by_task_id(stored.task_id())
        .await
        .expect("lookup");

    assert_eq!(found, Some(stored));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn listing_failure_surfaces_as_persistence_error() {
    let repository = InMemoryPullRequestRepository::new();
    repository.set_listing_failure(true).expect("toggle failure");

    let result = repository.list_actively_monitored().await;

    assert!(matches!(
        result,
        Err(PullRequestRepositoryError::Persistence(_))
    ));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn update_overwrites_the_stored_details() {
    let repository = InMemoryPullRequestRepository::new();
    let stored = open_pull_request(3);
    repository.store(&stored).await.expect("store");

    let mut refreshed = stored.clone();
    let remote = RemotePullRequest::open(stored.number(), "feature/3", "main")
        .with_mergeable(false, "dirty");
    assert!(refreshed.refresh_details(&remote, Utc::now()));
    repository.update(&refreshed).await.expect("update");

    let found = repository
        .find_by_id(stored.id())
        .await
        .expect("lookup")
        .expect("pull request exists");
    assert_eq!(found.mergeable(), Some(false));
    assert_eq!(found.mergeable_state(), Some("dirty"));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn update_reports_a_missing_pull_request() {
    let repository = InMemoryPullRequestRepository::new();
    let unknown = open_pull_request(4);

    let result = repository.update(&unknown).await;

    assert!(matches!(
        result,
        Err(PullRequestRepositoryError::NotFound(id)) if id == unknown.id()
    ));
}
