//! Durable script record contract.
//!
//! [`ScriptStore`] is the only way the execution core reads or writes
//! persisted state. Implementations must provide their own per-operation
//! atomicity; the core never locks around store calls.

use async_trait::async_trait;
use serde::Serialize;

use super::error::StoreError;
use crate::types::{DbId, Timestamp};

/// A persisted script execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptRecord {
    pub id: DbId,
    pub command: String,
    /// Everything the process has printed so far, one `\n` per line.
    pub output: String,
    pub is_running: bool,
    /// OS process ID, set once the process has started.
    pub pid: Option<i32>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for inserting a new script record.
#[derive(Debug, Clone)]
pub struct NewScript {
    pub command: String,
}

impl NewScript {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

/// Durable storage for [`ScriptRecord`]s.
///
/// Every operation addressing a single ID fails with
/// [`StoreError::NotFound`] when that ID does not exist.
#[async_trait]
pub trait ScriptStore: Send + Sync {
    /// Insert a new record (not running, no PID, empty output).
    async fn insert(&self, new: NewScript) -> Result<ScriptRecord, StoreError>;

    /// Record the PID and running state together.
    async fn update_pid_and_running(
        &self,
        id: DbId,
        pid: i32,
        is_running: bool,
    ) -> Result<ScriptRecord, StoreError>;

    /// Record the running state.
    async fn update_running(&self, id: DbId, is_running: bool)
        -> Result<ScriptRecord, StoreError>;

    /// Append `text` to the accumulated output.
    async fn append_output(&self, id: DbId, text: &str) -> Result<ScriptRecord, StoreError>;

    /// Fetch a single record.
    async fn get(&self, id: DbId) -> Result<ScriptRecord, StoreError>;

    /// List records ordered by creation time ascending, starting at `offset`.
    ///
    /// `limit = None` returns every record from `offset` onward.
    async fn get_all(
        &self,
        offset: i64,
        limit: Option<i64>,
    ) -> Result<Vec<ScriptRecord>, StoreError>;

    /// Remove a record, returning its last state.
    async fn delete(&self, id: DbId) -> Result<ScriptRecord, StoreError>;

    /// Cheap liveness probe for health checks.
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
