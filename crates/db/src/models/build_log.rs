use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

/// One line of a build's console output, numbered from 1 in emission order.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct BuildLogLine {
    pub build_id: Uuid,
    pub line_no: i64,
    pub content: String,
}

impl BuildLogLine {
    /// Append lines after any already stored for the build.
    pub async fn append_lines<S: AsRef<str>>(
        pool: &SqlitePool,
        build_id: Uuid,
        lines: &[S],
    ) -> Result<(), sqlx::Error> {
        if lines.is_empty() {
            return Ok(());
        }

        let mut tx = pool.begin().await?;

        let last: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(line_no), 0) FROM build_log_lines WHERE build_id = $1",
        )
        .bind(build_id)
        .fetch_one(&mut *tx)
        .await?;

        for (offset, line) in lines.iter().enumerate() {
            sqlx::query(
                r#"INSERT INTO build_log_lines (build_id, line_no, content)
                   VALUES ($1, $2, $3)"#,
            )
            .bind(build_id)
            .bind(last + offset as i64 + 1)
            .bind(line.as_ref())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// The `limit` most recent lines of the build, oldest first.
    pub async fn find_last_lines(
        pool: &SqlitePool,
        build_id: Uuid,
        limit: usize,
    ) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar(
            r#"SELECT content FROM (
                   SELECT line_no, content FROM build_log_lines
                   WHERE build_id = $1
                   ORDER BY line_no DESC
                   LIMIT $2
               )
               ORDER BY line_no ASC"#,
        )
        .bind(build_id)
        // A negative LIMIT means "no limit" to SQLite; clamp instead of wrapping.
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(pool)
        .await
    }

    pub async fn count_for_build(pool: &SqlitePool, build_id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM build_log_lines WHERE build_id = $1")
            .bind(build_id)
            .fetch_one(pool)
            .await
    }
}
