//! Script execution row model.

use scriptd_core::scripting::store::ScriptRecord;
use scriptd_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `scripts` table.
#[derive(Debug, Clone, FromRow)]
pub struct Script {
    pub id: DbId,
    pub command: String,
    pub output: String,
    pub is_running: bool,
    pub pid: Option<i32>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<Script> for ScriptRecord {
    fn from(row: Script) -> Self {
        Self {
            id: row.id,
            command: row.command,
            output: row.output,
            is_running: row.is_running,
            pid: row.pid,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
