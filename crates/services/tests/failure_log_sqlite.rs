//! End-to-end tests for failure excerpts over the SQLite-backed build host.
//!
//! Covers the freestyle and multi-configuration flows: a failed build of an
//! enabled job shows its excerpt at build and project level, aggregate parent
//! builds never do, and children pick up the parent's flag on completion.

use std::sync::Arc;

use db::{
    models::{
        build::{Build, BuildKind, BuildResult},
        build_log::BuildLogLine,
        job::{CreateJob, Job},
    },
    test_utils::create_test_pool,
};
use services::services::{
    build_host::{BuildHost, BuildHostError, JobPropertyStore, LocalBuildHost},
    config::Config,
    failure_log::{AssociationState, FailureLogError, FailureLogService},
    flag_propagation::{PropagationOutcome, on_build_completed},
};
use sqlx::SqlitePool;
use uuid::Uuid;

const MARK: &str = "2fccfb266cd62bdd947917259625e0dc";

async fn create_job(
    pool: &SqlitePool,
    name: &str,
    parent_id: Option<Uuid>,
    flag: Option<bool>,
) -> Job {
    let data = CreateJob {
        name: name.to_string(),
        parent_id,
        show_console_excerpt: flag,
    };
    Job::create(pool, &data, Uuid::new_v4())
        .await
        .expect("Failed to create job")
}

/// Run a build whose console ends with a failing step echoing `MARK`.
async fn run_failing_build(pool: &SqlitePool, job: &Job, kind: BuildKind) -> Build {
    let build = Build::create(pool, job.id, kind, Uuid::new_v4())
        .await
        .expect("Failed to create build");

    let mut lines: Vec<String> = (1..=40).map(|i| format!("preamble {i}")).collect();
    lines.extend([
        "Started by user admin".to_string(),
        format!("Building {} in workspace /var/lib/ci/workspace/{}", job.name, job.name),
        "[workspace] $ /bin/sh -xe /tmp/script.sh".to_string(),
        format!("+ echo {MARK}"),
        MARK.to_string(),
        String::new(),
        "+ exit 1".to_string(),
        "Build step 'Execute shell' marked build as failure".to_string(),
        "Finished: FAILURE".to_string(),
    ]);
    BuildLogLine::append_lines(pool, build.id, &lines)
        .await
        .expect("Failed to append log");

    Build::complete(pool, build.id, BuildResult::Failure)
        .await
        .expect("Failed to complete build")
}

fn service(host: &LocalBuildHost) -> FailureLogService {
    FailureLogService::new(
        Arc::new(host.clone()),
        Arc::new(host.clone()),
        &Config::default(),
    )
}

fn contains_mark(excerpt: Option<Arc<services::services::excerpt::Excerpt>>) -> bool {
    excerpt.is_some_and(|e| e.to_text().contains(MARK))
}

#[tokio::test]
async fn test_freestyle_failure_is_visualized() {
    let (pool, _dir) = create_test_pool().await;
    let host = LocalBuildHost::new(pool.clone());
    let job = create_job(&pool, "freestyle", None, Some(true)).await;
    let build = run_failing_build(&pool, &job, BuildKind::Leaf).await;
    let service = service(&host);

    let excerpt = service.get_excerpt(build.id).await.unwrap().unwrap();
    assert_eq!(
        excerpt.lines(),
        &[
            "Building freestyle in workspace /var/lib/ci/workspace/freestyle",
            "[workspace] $ /bin/sh -xe /tmp/script.sh",
            "+ echo 2fccfb266cd62bdd947917259625e0dc",
            "2fccfb266cd62bdd947917259625e0dc",
            "+ exit 1",
            "Build step 'Execute shell' marked build as failure",
        ]
    );
    assert_eq!(service.association_state(build.id), AssociationState::Computed);
    assert!(contains_mark(service.project_excerpt(job.id).await.unwrap()));
}

#[tokio::test]
async fn test_disabled_job_shows_nothing() {
    let (pool, _dir) = create_test_pool().await;
    let host = LocalBuildHost::new(pool.clone());
    let job = create_job(&pool, "freestyle", None, None).await;
    let build = run_failing_build(&pool, &job, BuildKind::Leaf).await;
    let service = service(&host);

    assert!(!contains_mark(service.get_excerpt(build.id).await.unwrap()));
    assert!(!contains_mark(service.project_excerpt(job.id).await.unwrap()));
    assert_eq!(service.association_state(build.id), AssociationState::Absent);
}

#[tokio::test]
async fn test_matrix_children_visualized_parent_not() {
    let (pool, _dir) = create_test_pool().await;
    let host = LocalBuildHost::new(pool.clone());
    let parent = create_job(&pool, "matrix", None, Some(true)).await;
    let child = create_job(&pool, "default", Some(parent.id), None).await;
    let service = service(&host);

    let aggregate = run_failing_build(&pool, &parent, BuildKind::Aggregate).await;
    let child_build = run_failing_build(&pool, &child, BuildKind::Leaf).await;

    // Before propagation the child does not own the flag.
    assert!(!contains_mark(service.get_excerpt(child_build.id).await.unwrap()));

    let outcome = on_build_completed(&host, &host, child_build.id).await;
    assert_eq!(outcome, PropagationOutcome::Copied);
    assert_eq!(host.get_feature_flag(child.id).await.unwrap(), Some(true));

    assert!(contains_mark(service.get_excerpt(child_build.id).await.unwrap()));
    assert!(contains_mark(service.project_excerpt(child.id).await.unwrap()));
    assert!(!contains_mark(service.get_excerpt(aggregate.id).await.unwrap()));
    assert!(!contains_mark(service.project_excerpt(parent.id).await.unwrap()));

    let parent_outcome = on_build_completed(&host, &host, aggregate.id).await;
    assert_eq!(parent_outcome, PropagationOutcome::NoParent);
}

#[tokio::test]
async fn test_successful_build_shows_nothing() {
    let (pool, _dir) = create_test_pool().await;
    let host = LocalBuildHost::new(pool.clone());
    let job = create_job(&pool, "freestyle", None, Some(true)).await;
    let build = Build::create(&pool, job.id, BuildKind::Leaf, Uuid::new_v4()).await.unwrap();
    BuildLogLine::append_lines(&pool, build.id, &["Building x in workspace /w", MARK])
        .await
        .unwrap();
    Build::complete(&pool, build.id, BuildResult::Success).await.unwrap();

    let service = service(&host);
    assert!(service.get_excerpt(build.id).await.unwrap().is_none());
    assert!(service.project_excerpt(job.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_running_build_shows_nothing() {
    let (pool, _dir) = create_test_pool().await;
    let host = LocalBuildHost::new(pool.clone());
    let job = create_job(&pool, "freestyle", None, Some(true)).await;
    let build = Build::create(&pool, job.id, BuildKind::Leaf, Uuid::new_v4()).await.unwrap();

    assert_eq!(host.get_result(build.id).await.unwrap(), None);
    assert!(service(&host).get_excerpt(build.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_unknown_ids_surface_as_errors() {
    let (pool, _dir) = create_test_pool().await;
    let host = LocalBuildHost::new(pool);
    let missing = Uuid::new_v4();

    let err = service(&host).get_excerpt(missing).await.unwrap_err();
    assert!(matches!(
        err,
        FailureLogError::Host(BuildHostError::BuildNotFound(id)) if id == missing
    ));
    assert!(matches!(
        host.set_feature_flag(missing, true).await,
        Err(BuildHostError::JobNotFound(_))
    ));
}
