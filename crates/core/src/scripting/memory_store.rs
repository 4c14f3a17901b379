//! In-process [`ScriptStore`] implementation.
//!
//! Used by tests and by the server when no `DATABASE_URL` is configured.
//! Records are lost on restart.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::error::StoreError;
use super::store::{NewScript, ScriptRecord, ScriptStore};
use crate::types::DbId;

#[derive(Default)]
struct Inner {
    next_id: DbId,
    records: BTreeMap<DbId, ScriptRecord>,
}

/// A [`ScriptStore`] backed by an ordered in-memory map.
#[derive(Default)]
pub struct MemoryScriptStore {
    inner: RwLock<Inner>,
}

impl MemoryScriptStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.inner.read().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Apply `f` to the record with `id` and return the updated copy.
    async fn update<F>(&self, id: DbId, f: F) -> Result<ScriptRecord, StoreError>
    where
        F: FnOnce(&mut ScriptRecord) + Send,
    {
        let mut inner = self.inner.write().await;
        let record = inner
            .records
            .get_mut(&id)
            .ok_or(StoreError::NotFound(id))?;
        f(record);
        record.updated_at = Utc::now();
        Ok(record.clone())
    }
}

#[async_trait]
impl ScriptStore for MemoryScriptStore {
    async fn insert(&self, new: NewScript) -> Result<ScriptRecord, StoreError> {
        let mut inner = self.inner.write().await;
        inner.next_id += 1;
        let now = Utc::now();
        let record = ScriptRecord {
            id: inner.next_id,
            command: new.command,
            output: String::new(),
            is_running: false,
            pid: None,
            created_at: now,
            updated_at: now,
        };
        inner.records.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update_pid_and_running(
        &self,
        id: DbId,
        pid: i32,
        is_running: bool,
    ) -> Result<ScriptRecord, StoreError> {
        self.update(id, |r| {
            r.pid = Some(pid);
            r.is_running = is_running;
        })
        .await
    }

    async fn update_running(
        &self,
        id: DbId,
        is_running: bool,
    ) -> Result<ScriptRecord, StoreError> {
        self.update(id, |r| r.is_running = is_running).await
    }

    async fn append_output(&self, id: DbId, text: &str) -> Result<ScriptRecord, StoreError> {
        self.update(id, |r| r.output.push_str(text)).await
    }

    async fn get(&self, id: DbId) -> Result<ScriptRecord, StoreError> {
        self.inner
            .read()
            .await
            .records
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    async fn get_all(
        &self,
        offset: i64,
        limit: Option<i64>,
    ) -> Result<Vec<ScriptRecord>, StoreError> {
        let inner = self.inner.read().await;
        let mut records: Vec<ScriptRecord> = inner.records.values().cloned().collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        let skip = usize::try_from(offset.max(0)).unwrap_or(usize::MAX);
        let take = match limit {
            Some(n) => usize::try_from(n.max(0)).unwrap_or(usize::MAX),
            None => usize::MAX,
        };
        Ok(records.into_iter().skip(skip).take(take).collect())
    }

    async fn delete(&self, id: DbId) -> Result<ScriptRecord, StoreError> {
        self.inner
            .write()
            .await
            .records
            .remove(&id)
            .ok_or(StoreError::NotFound(id))
    }
}
