use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type};
use uuid::Uuid;

const BUILD_COLUMNS: &str = "id, job_id, number, kind, result, started_at, completed_at";

/// Terminal verdict of a completed build.
#[derive(Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[sqlx(type_name = "build_result", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BuildResult {
    Success,
    Unstable,
    Failure,
    NotBuilt,
    Aborted,
}

/// Leaf builds execute work; aggregate builds only fan out to per-configuration children.
#[derive(Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, Default)]
#[sqlx(type_name = "build_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BuildKind {
    #[default]
    Leaf,
    Aggregate,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Build {
    pub id: Uuid,
    pub job_id: Uuid,
    pub number: i64,
    pub kind: BuildKind,
    /// `None` while the build is running.
    pub result: Option<BuildResult>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Build {
    pub fn is_aggregate(&self) -> bool {
        self.kind == BuildKind::Aggregate
    }

    /// Start a new build of `job_id`, numbered after the job's latest build.
    pub async fn create(
        pool: &SqlitePool,
        job_id: Uuid,
        kind: BuildKind,
        id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Build>(&format!(
            r#"INSERT INTO builds (id, job_id, number, kind, result, started_at, completed_at)
               VALUES (
                   $1,
                   $2,
                   (SELECT COALESCE(MAX(number), 0) + 1 FROM builds WHERE job_id = $2),
                   $3,
                   NULL,
                   $4,
                   NULL
               )
               RETURNING {BUILD_COLUMNS}"#
        ))
        .bind(id)
        .bind(job_id)
        .bind(kind)
        .bind(Utc::now())
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Build>(&format!("SELECT {BUILD_COLUMNS} FROM builds WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Most recent build of the job that has reached a terminal result.
    pub async fn find_last_completed(
        pool: &SqlitePool,
        job_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Build>(&format!(
            r#"SELECT {BUILD_COLUMNS} FROM builds
               WHERE job_id = $1 AND result IS NOT NULL
               ORDER BY number DESC
               LIMIT 1"#
        ))
        .bind(job_id)
        .fetch_optional(pool)
        .await
    }

    /// Record the terminal result. Completed builds are immutable, so a
    /// second call for the same build is rejected with `RowNotFound`.
    pub async fn complete(
        pool: &SqlitePool,
        id: Uuid,
        result: BuildResult,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Build>(&format!(
            r#"UPDATE builds
               SET result = $1, completed_at = $2
               WHERE id = $3 AND result IS NULL
               RETURNING {BUILD_COLUMNS}"#
        ))
        .bind(result)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(sqlx::Error::RowNotFound)
    }
}
