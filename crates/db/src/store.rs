//! [`ScriptStore`] over PostgreSQL.

use async_trait::async_trait;
use scriptd_core::scripting::error::StoreError;
use scriptd_core::scripting::store::{NewScript, ScriptRecord, ScriptStore};
use scriptd_core::types::DbId;

use crate::models::script::Script;
use crate::repositories::ScriptRepo;
use crate::DbPool;

/// Script store backed by the `scripts` table.
#[derive(Clone)]
pub struct PgScriptStore {
    pool: DbPool,
}

impl PgScriptStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Map a single-row result onto the store contract.
fn found(id: DbId, row: Result<Option<Script>, sqlx::Error>) -> Result<ScriptRecord, StoreError> {
    match row {
        Ok(Some(script)) => Ok(script.into()),
        Ok(None) | Err(sqlx::Error::RowNotFound) => {
            tracing::debug!(script_id = id, "Script row not found");
            Err(StoreError::NotFound(id))
        }
        Err(e) => {
            tracing::error!(script_id = id, error = %e, "Script query failed");
            Err(StoreError::backend(e))
        }
    }
}

#[async_trait]
impl ScriptStore for PgScriptStore {
    async fn insert(&self, new: NewScript) -> Result<ScriptRecord, StoreError> {
        ScriptRepo::create(&self.pool, &new.command)
            .await
            .map(Into::into)
            .map_err(StoreError::backend)
    }

    async fn update_pid_and_running(
        &self,
        id: DbId,
        pid: i32,
        is_running: bool,
    ) -> Result<ScriptRecord, StoreError> {
        found(
            id,
            ScriptRepo::set_pid_and_running(&self.pool, id, pid, is_running).await,
        )
    }

    async fn update_running(
        &self,
        id: DbId,
        is_running: bool,
    ) -> Result<ScriptRecord, StoreError> {
        found(id, ScriptRepo::set_running(&self.pool, id, is_running).await)
    }

    async fn append_output(&self, id: DbId, text: &str) -> Result<ScriptRecord, StoreError> {
        found(id, ScriptRepo::append_output(&self.pool, id, text).await)
    }

    async fn get(&self, id: DbId) -> Result<ScriptRecord, StoreError> {
        found(id, ScriptRepo::find_by_id(&self.pool, id).await)
    }

    async fn get_all(
        &self,
        offset: i64,
        limit: Option<i64>,
    ) -> Result<Vec<ScriptRecord>, StoreError> {
        let rows = ScriptRepo::list(&self.pool, offset.max(0), limit.map(|n| n.max(0)))
            .await
            .map_err(StoreError::backend)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn delete(&self, id: DbId) -> Result<ScriptRecord, StoreError> {
        found(id, ScriptRepo::delete(&self.pool, id).await)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        crate::health_check(&self.pool)
            .await
            .map_err(StoreError::backend)
    }
}
