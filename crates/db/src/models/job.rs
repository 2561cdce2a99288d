use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

const JOB_COLUMNS: &str = "id, name, parent_id, show_console_excerpt, created_at, updated_at";

/// A configured unit of work. Child jobs (per-configuration jobs of a
/// multi-configuration parent) point at their parent through `parent_id`.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub name: String,
    pub parent_id: Option<Uuid>,
    /// `None` until the job owns the flag, either set by a user or copied from its parent.
    pub show_console_excerpt: Option<bool>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateJob {
    pub name: String,
    pub parent_id: Option<Uuid>,
    pub show_console_excerpt: Option<bool>,
}

impl Job {
    pub async fn create(
        pool: &SqlitePool,
        data: &CreateJob,
        id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        let now = Utc::now();
        sqlx::query_as::<_, Job>(&format!(
            r#"INSERT INTO jobs (id, name, parent_id, show_console_excerpt, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6)
               RETURNING {JOB_COLUMNS}"#
        ))
        .bind(id)
        .bind(&data.name)
        .bind(data.parent_id)
        .bind(data.show_console_excerpt)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Job>(&format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_children(
        pool: &SqlitePool,
        parent_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Job>(&format!(
            "SELECT {JOB_COLUMNS} FROM jobs WHERE parent_id = $1 ORDER BY name ASC"
        ))
        .bind(parent_id)
        .fetch_all(pool)
        .await
    }

    /// Set the console-excerpt flag. Returns `RowNotFound` if the job does not exist.
    pub async fn set_show_console_excerpt(
        pool: &SqlitePool,
        id: Uuid,
        enabled: bool,
    ) -> Result<(), sqlx::Error> {
        let result = sqlx::query(
            r#"UPDATE jobs
               SET show_console_excerpt = $1, updated_at = $2
               WHERE id = $3"#,
        )
        .bind(enabled)
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }
        Ok(())
    }
}
