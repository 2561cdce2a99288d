//! Failure excerpt queries for builds and projects.
//!
//! A build gets an excerpt only when its result is exactly `Failure`, it is
//! not the aggregate record of a multi-configuration parent, and its owning
//! job has the console excerpt flag enabled. These gates are checked on every
//! query.
//!
//! The first successful query computes the excerpt from the host's console
//! tail and caches it per build; later queries are served from the cache and
//! never read the log again. Concurrent first queries may each compute it;
//! extraction is pure, so they produce the same value and the first insert
//! wins. A failed log read leaves nothing behind and the next query retries.

use std::sync::Arc;

use dashmap::DashMap;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{
    build_host::{BuildHost, BuildHostError, BuildResult, JobPropertyStore},
    config::Config,
    excerpt::{Excerpt, extract},
};

#[derive(Debug, Error)]
pub enum FailureLogError {
    #[error(transparent)]
    Host(#[from] BuildHostError),
}

/// Whether a build's excerpt has been computed yet. `Computed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssociationState {
    Absent,
    Computed,
}

pub struct FailureLogService {
    host: Arc<dyn BuildHost>,
    properties: Arc<dyn JobPropertyStore>,
    tail_lines: usize,
    cache: DashMap<Uuid, Arc<Excerpt>>,
}

impl FailureLogService {
    pub fn new(
        host: Arc<dyn BuildHost>,
        properties: Arc<dyn JobPropertyStore>,
        config: &Config,
    ) -> Self {
        Self {
            host,
            properties,
            tail_lines: config.tail_lines,
            cache: DashMap::new(),
        }
    }

    async fn is_eligible(&self, build_id: Uuid) -> Result<bool, FailureLogError> {
        if self.host.get_result(build_id).await? != Some(BuildResult::Failure) {
            return Ok(false);
        }
        if self.host.is_composite_aggregate(build_id).await? {
            return Ok(false);
        }

        let job_id = self.host.owning_job(build_id).await?;
        let enabled = self
            .properties
            .get_feature_flag(job_id)
            .await?
            .unwrap_or(false);
        Ok(enabled)
    }

    /// Excerpt of a failed build, or `None` when the build does not qualify.
    pub async fn get_excerpt(
        &self,
        build_id: Uuid,
    ) -> Result<Option<Arc<Excerpt>>, FailureLogError> {
        if !self.is_eligible(build_id).await? {
            return Ok(None);
        }

        if let Some(cached) = self.cache.get(&build_id) {
            return Ok(Some(Arc::clone(cached.value())));
        }

        let tail = match self.host.read_last_lines(build_id, self.tail_lines).await {
            Ok(tail) => tail,
            Err(e) => {
                warn!(build_id = %build_id, error = %e, "Failed to read console tail");
                return Err(e.into());
            }
        };

        let excerpt = Arc::new(extract(&tail));
        debug!(
            build_id = %build_id,
            tail_lines = tail.len(),
            excerpt_lines = excerpt.len(),
            "Computed failure excerpt"
        );

        let stored = Arc::clone(self.cache.entry(build_id).or_insert(excerpt).value());
        Ok(Some(stored))
    }

    /// Project-level view: the excerpt of the job's last completed build.
    pub async fn project_excerpt(
        &self,
        job_id: Uuid,
    ) -> Result<Option<Arc<Excerpt>>, FailureLogError> {
        match self.host.last_completed_build(job_id).await? {
            Some(build_id) => self.get_excerpt(build_id).await,
            None => Ok(None),
        }
    }

    pub fn association_state(&self, build_id: Uuid) -> AssociationState {
        if self.cache.contains_key(&build_id) {
            AssociationState::Computed
        } else {
            AssociationState::Absent
        }
    }

    pub fn cached_builds(&self) -> usize {
        self.cache.len()
    }
}
