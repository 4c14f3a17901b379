//! Repository for the `scripts` table.

use sqlx::PgPool;
use scriptd_core::types::DbId;

use crate::models::script::Script;

/// Column list for `scripts` queries.
const COLUMNS: &str = "id, command, output, is_running, pid, created_at, updated_at";

/// Provides CRUD operations for script executions.
///
/// Single-row operations return `None` when the ID does not exist.
pub struct ScriptRepo;

impl ScriptRepo {
    /// Insert a new script, not running and with empty output.
    pub async fn create(pool: &PgPool, command: &str) -> Result<Script, sqlx::Error> {
        let query = format!(
            "INSERT INTO scripts (command) \
             VALUES ($1) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Script>(&query)
            .bind(command)
            .fetch_one(pool)
            .await
    }

    /// Find a script by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Script>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM scripts WHERE id = $1");
        sqlx::query_as::<_, Script>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List scripts oldest-first. A `None` limit returns every row.
    pub async fn list(
        pool: &PgPool,
        offset: i64,
        limit: Option<i64>,
    ) -> Result<Vec<Script>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM scripts \
             ORDER BY created_at ASC, id ASC \
             LIMIT $1 OFFSET $2"
        );
        sqlx::query_as::<_, Script>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Set PID and running flag in one statement.
    pub async fn set_pid_and_running(
        pool: &PgPool,
        id: DbId,
        pid: i32,
        is_running: bool,
    ) -> Result<Option<Script>, sqlx::Error> {
        let query = format!(
            "UPDATE scripts SET pid = $2, is_running = $3, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Script>(&query)
            .bind(id)
            .bind(pid)
            .bind(is_running)
            .fetch_optional(pool)
            .await
    }

    pub async fn set_running(
        pool: &PgPool,
        id: DbId,
        is_running: bool,
    ) -> Result<Option<Script>, sqlx::Error> {
        let query = format!(
            "UPDATE scripts SET is_running = $2, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Script>(&query)
            .bind(id)
            .bind(is_running)
            .fetch_optional(pool)
            .await
    }

    /// Append to the output column server-side, so concurrent appends never
    /// overwrite each other.
    pub async fn append_output(
        pool: &PgPool,
        id: DbId,
        text: &str,
    ) -> Result<Option<Script>, sqlx::Error> {
        let query = format!(
            "UPDATE scripts SET output = output || $2, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Script>(&query)
            .bind(id)
            .bind(text)
            .fetch_optional(pool)
            .await
    }

    /// Clear the running flag on every row still marked running.
    ///
    /// Processes never outlive the server, so rows left running by a
    /// previous instance are stale. Returns the number of rows reset.
    pub async fn reset_running(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE scripts SET is_running = false, updated_at = NOW() \
             WHERE is_running",
        )
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Delete a script, returning the removed row.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<Option<Script>, sqlx::Error> {
        let query = format!("DELETE FROM scripts WHERE id = $1 RETURNING {COLUMNS}");
        sqlx::query_as::<_, Script>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
