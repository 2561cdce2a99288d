//! Collaborator interfaces to the host build system.
//!
//! Excerpt queries and flag propagation only see builds and jobs through
//! these traits, so any build orchestrator can embed them. Two
//! implementations ship here: an in-memory mock and one backed by the
//! `db` crate.

mod local;
mod mock;

pub use db::models::build::{BuildKind, BuildResult};
pub use local::LocalBuildHost;
pub use mock::MockBuildHost;

use async_trait::async_trait;
use thiserror::Error;
use utils::log_tail::LogTail;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum BuildHostError {
    #[error("Build not found: {0}")]
    BuildNotFound(Uuid),
    #[error("Job not found: {0}")]
    JobNotFound(Uuid),
    #[error("Failed to read console log of build {build_id}: {message}")]
    LogRead { build_id: Uuid, message: String },
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Read access to builds, their console output, and the job hierarchy.
#[async_trait]
pub trait BuildHost: Send + Sync {
    /// Up to `limit` most recent console lines of the build, oldest first.
    async fn read_last_lines(
        &self,
        build_id: Uuid,
        limit: usize,
    ) -> Result<LogTail, BuildHostError>;

    /// Terminal result, or `None` while the build has not finished.
    async fn get_result(&self, build_id: Uuid) -> Result<Option<BuildResult>, BuildHostError>;

    /// True for aggregate records of multi-configuration parents.
    async fn is_composite_aggregate(&self, build_id: Uuid) -> Result<bool, BuildHostError>;

    async fn owning_job(&self, build_id: Uuid) -> Result<Uuid, BuildHostError>;

    /// Parent of a per-configuration child job, `None` for top-level jobs.
    async fn parent_job(&self, job_id: Uuid) -> Result<Option<Uuid>, BuildHostError>;

    async fn last_completed_build(&self, job_id: Uuid) -> Result<Option<Uuid>, BuildHostError>;
}

/// Per-job persisted "show console excerpt on failure" toggle.
#[async_trait]
pub trait JobPropertyStore: Send + Sync {
    /// `None` if the job has never owned the flag.
    async fn get_feature_flag(&self, job_id: Uuid) -> Result<Option<bool>, BuildHostError>;

    async fn set_feature_flag(&self, job_id: Uuid, enabled: bool) -> Result<(), BuildHostError>;
}
