//! Copy the console excerpt flag from a multi-configuration parent job onto
//! its child jobs.
//!
//! A child that does not own the flag yet takes the parent's enabled flag
//! the first time one of its builds completes. After that the child owns an
//! independent copy; later edits on the parent do not reach it. Propagation
//! is best-effort: every failure is logged and reported as
//! [`PropagationOutcome::Failed`], never returned as an error.

use tracing::{debug, warn};
use uuid::Uuid;

use super::build_host::{BuildHost, JobPropertyStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropagationOutcome {
    /// The parent's flag was copied onto the child.
    Copied,
    /// The child already owns a flag; nothing changed.
    AlreadySet,
    /// The parent does not have the flag enabled.
    ParentDisabled,
    /// The job is not a child of a multi-configuration parent.
    NoParent,
    /// A lookup or the write failed; the error was logged.
    Failed,
}

/// One-shot copy of `parent_job`'s flag onto `child_job`.
pub async fn propagate_feature_flag(
    store: &dyn JobPropertyStore,
    child_job: Uuid,
    parent_job: Uuid,
) -> PropagationOutcome {
    match store.get_feature_flag(child_job).await {
        Ok(Some(_)) => return PropagationOutcome::AlreadySet,
        Ok(None) => {}
        Err(e) => {
            warn!(job_id = %child_job, error = %e, "Failed to read child job flag");
            return PropagationOutcome::Failed;
        }
    }

    match store.get_feature_flag(parent_job).await {
        Ok(Some(true)) => {}
        Ok(_) => return PropagationOutcome::ParentDisabled,
        Err(e) => {
            warn!(job_id = %parent_job, error = %e, "Failed to read parent job flag");
            return PropagationOutcome::Failed;
        }
    }

    match store.set_feature_flag(child_job, true).await {
        Ok(()) => {
            debug!(
                job_id = %child_job,
                parent_job_id = %parent_job,
                "Copied console excerpt flag from parent job"
            );
            PropagationOutcome::Copied
        }
        Err(e) => {
            // Best effort
            warn!(
                job_id = %child_job,
                parent_job_id = %parent_job,
                error = %e,
                "Failed to copy console excerpt flag onto child job"
            );
            PropagationOutcome::Failed
        }
    }
}

/// Build-completion hook: propagate the flag to the build's job if that job
/// is a child of a multi-configuration parent.
pub async fn on_build_completed(
    host: &dyn BuildHost,
    store: &dyn JobPropertyStore,
    build_id: Uuid,
) -> PropagationOutcome {
    let job_id = match host.owning_job(build_id).await {
        Ok(job_id) => job_id,
        Err(e) => {
            warn!(build_id = %build_id, error = %e, "Failed to resolve job of completed build");
            return PropagationOutcome::Failed;
        }
    };

    match host.parent_job(job_id).await {
        Ok(Some(parent_id)) => propagate_feature_flag(store, job_id, parent_id).await,
        Ok(None) => PropagationOutcome::NoParent,
        Err(e) => {
            warn!(job_id = %job_id, error = %e, "Failed to resolve parent job");
            PropagationOutcome::Failed
        }
    }
}
