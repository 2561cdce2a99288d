//! Mock implementation of the build host for testing.
//!
//! Jobs, builds and console output live in memory and can be manipulated
//! directly. Log reads and flag writes can be made to fail on demand.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use utils::log_tail::LogTail;
use uuid::Uuid;

use super::{BuildHost, BuildHostError, BuildKind, BuildResult, JobPropertyStore};

#[derive(Debug, Clone)]
struct MockJob {
    parent_id: Option<Uuid>,
    feature_flag: Option<bool>,
}

#[derive(Debug, Clone)]
struct MockBuild {
    job_id: Uuid,
    number: u64,
    kind: BuildKind,
    result: Option<BuildResult>,
    log: Vec<String>,
}

#[derive(Default)]
struct Inner {
    jobs: HashMap<Uuid, MockJob>,
    builds: HashMap<Uuid, MockBuild>,
}

#[derive(Clone, Default)]
pub struct MockBuildHost {
    inner: Arc<RwLock<Inner>>,
    fail_log_reads: Arc<AtomicBool>,
    fail_flag_writes: Arc<AtomicBool>,
    log_reads: Arc<AtomicUsize>,
}

impl MockBuildHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job. `parent_id` makes it a per-configuration child.
    pub fn add_job(&self, job_id: Uuid, parent_id: Option<Uuid>, feature_flag: Option<bool>) {
        let mut inner = self.inner.write().unwrap();
        inner.jobs.insert(
            job_id,
            MockJob {
                parent_id,
                feature_flag,
            },
        );
    }

    /// Register a build numbered after the job's previous builds.
    pub fn add_build(
        &self,
        build_id: Uuid,
        job_id: Uuid,
        kind: BuildKind,
        result: Option<BuildResult>,
    ) {
        let mut inner = self.inner.write().unwrap();
        let number = inner
            .builds
            .values()
            .filter(|b| b.job_id == job_id)
            .map(|b| b.number)
            .max()
            .unwrap_or(0)
            + 1;
        inner.builds.insert(
            build_id,
            MockBuild {
                job_id,
                number,
                kind,
                result,
                log: Vec::new(),
            },
        );
    }

    pub fn complete_build(&self, build_id: Uuid, result: BuildResult) {
        let mut inner = self.inner.write().unwrap();
        if let Some(build) = inner.builds.get_mut(&build_id) {
            build.result = Some(result);
        }
    }

    /// Replace the build's whole console output.
    pub fn set_log<I, S>(&self, build_id: Uuid, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut inner = self.inner.write().unwrap();
        if let Some(build) = inner.builds.get_mut(&build_id) {
            build.log = lines.into_iter().map(Into::into).collect();
        }
    }

    pub fn set_fail_log_reads(&self, fail: bool) {
        self.fail_log_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_flag_writes(&self, fail: bool) {
        self.fail_flag_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful `read_last_lines` calls so far.
    pub fn log_reads(&self) -> usize {
        self.log_reads.load(Ordering::SeqCst)
    }

    fn build(&self, build_id: Uuid) -> Result<MockBuild, BuildHostError> {
        let inner = self.inner.read().unwrap();
        inner
            .builds
            .get(&build_id)
            .cloned()
            .ok_or(BuildHostError::BuildNotFound(build_id))
    }

    fn job(&self, job_id: Uuid) -> Result<MockJob, BuildHostError> {
        let inner = self.inner.read().unwrap();
        inner
            .jobs
            .get(&job_id)
            .cloned()
            .ok_or(BuildHostError::JobNotFound(job_id))
    }
}

#[async_trait]
impl BuildHost for MockBuildHost {
    async fn read_last_lines(
        &self,
        build_id: Uuid,
        limit: usize,
    ) -> Result<LogTail, BuildHostError> {
        let build = self.build(build_id)?;
        if self.fail_log_reads.load(Ordering::SeqCst) {
            return Err(BuildHostError::LogRead {
                build_id,
                message: "injected read failure".to_string(),
            });
        }

        self.log_reads.fetch_add(1, Ordering::SeqCst);
        let skip = build.log.len().saturating_sub(limit);
        Ok(LogTail::from_lines(build.log.into_iter().skip(skip)))
    }

    async fn get_result(&self, build_id: Uuid) -> Result<Option<BuildResult>, BuildHostError> {
        Ok(self.build(build_id)?.result)
    }

    async fn is_composite_aggregate(&self, build_id: Uuid) -> Result<bool, BuildHostError> {
        Ok(self.build(build_id)?.kind == BuildKind::Aggregate)
    }

    async fn owning_job(&self, build_id: Uuid) -> Result<Uuid, BuildHostError> {
        Ok(self.build(build_id)?.job_id)
    }

    async fn parent_job(&self, job_id: Uuid) -> Result<Option<Uuid>, BuildHostError> {
        Ok(self.job(job_id)?.parent_id)
    }

    async fn last_completed_build(&self, job_id: Uuid) -> Result<Option<Uuid>, BuildHostError> {
        let inner = self.inner.read().unwrap();
        Ok(inner
            .builds
            .iter()
            .filter(|(_, b)| b.job_id == job_id && b.result.is_some())
            .max_by_key(|(_, b)| b.number)
            .map(|(id, _)| *id))
    }
}

#[async_trait]
impl JobPropertyStore for MockBuildHost {
    async fn get_feature_flag(&self, job_id: Uuid) -> Result<Option<bool>, BuildHostError> {
        Ok(self.job(job_id)?.feature_flag)
    }

    async fn set_feature_flag(&self, job_id: Uuid, enabled: bool) -> Result<(), BuildHostError> {
        if self.fail_flag_writes.load(Ordering::SeqCst) {
            return Err(BuildHostError::Storage(format!(
                "injected write failure for job {job_id}"
            )));
        }

        let mut inner = self.inner.write().unwrap();
        let job = inner
            .jobs
            .get_mut(&job_id)
            .ok_or(BuildHostError::JobNotFound(job_id))?;
        job.feature_flag = Some(enabled);
        Ok(())
    }
}
