//! Build host backed by the local SQLite database.

use async_trait::async_trait;
use db::models::{build::Build, build_log::BuildLogLine, job::Job};
use sqlx::SqlitePool;
use utils::log_tail::LogTail;
use uuid::Uuid;

use super::{BuildHost, BuildHostError, BuildResult, JobPropertyStore};

#[derive(Debug, Clone)]
pub struct LocalBuildHost {
    pool: SqlitePool,
}

impl LocalBuildHost {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn build(&self, build_id: Uuid) -> Result<Build, BuildHostError> {
        Build::find_by_id(&self.pool, build_id)
            .await?
            .ok_or(BuildHostError::BuildNotFound(build_id))
    }

    async fn job(&self, job_id: Uuid) -> Result<Job, BuildHostError> {
        Job::find_by_id(&self.pool, job_id)
            .await?
            .ok_or(BuildHostError::JobNotFound(job_id))
    }
}

#[async_trait]
impl BuildHost for LocalBuildHost {
    async fn read_last_lines(
        &self,
        build_id: Uuid,
        limit: usize,
    ) -> Result<LogTail, BuildHostError> {
        // Distinguish "no output" from "no such build".
        self.build(build_id).await?;

        let lines = BuildLogLine::find_last_lines(&self.pool, build_id, limit)
            .await
            .map_err(|e| BuildHostError::LogRead {
                build_id,
                message: e.to_string(),
            })?;
        Ok(LogTail::from_lines(lines))
    }

    async fn get_result(&self, build_id: Uuid) -> Result<Option<BuildResult>, BuildHostError> {
        Ok(self.build(build_id).await?.result)
    }

    async fn is_composite_aggregate(&self, build_id: Uuid) -> Result<bool, BuildHostError> {
        Ok(self.build(build_id).await?.is_aggregate())
    }

    async fn owning_job(&self, build_id: Uuid) -> Result<Uuid, BuildHostError> {
        Ok(self.build(build_id).await?.job_id)
    }

    async fn parent_job(&self, job_id: Uuid) -> Result<Option<Uuid>, BuildHostError> {
        Ok(self.job(job_id).await?.parent_id)
    }

    async fn last_completed_build(&self, job_id: Uuid) -> Result<Option<Uuid>, BuildHostError> {
        Ok(Build::find_last_completed(&self.pool, job_id)
            .await?
            .map(|build| build.id))
    }
}

#[async_trait]
impl JobPropertyStore for LocalBuildHost {
    async fn get_feature_flag(&self, job_id: Uuid) -> Result<Option<bool>, BuildHostError> {
        Ok(self.job(job_id).await?.show_console_excerpt)
    }

    async fn set_feature_flag(&self, job_id: Uuid, enabled: bool) -> Result<(), BuildHostError> {
        match Job::set_show_console_excerpt(&self.pool, job_id, enabled).await {
            Ok(()) => Ok(()),
            Err(sqlx::Error::RowNotFound) => Err(BuildHostError::JobNotFound(job_id)),
            Err(e) => Err(e.into()),
        }
    }
}
