//! Error types for script execution and durable storage.

use crate::types::DbId;

/// Boxed error from a storage backend (sqlx, etc.).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors reported by a [`ScriptStore`](super::store::ScriptStore).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No record exists for the given ID.
    #[error("script {0} not found in store")]
    NotFound(DbId),

    /// Any other backend failure.
    #[error("store backend error: {0}")]
    Backend(#[source] BoxError),
}

impl StoreError {
    /// Wrap an arbitrary backend error.
    pub fn backend<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::Backend(err.into())
    }
}

/// Errors surfaced by caller-facing script operations.
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    /// The submitted command was empty or whitespace only.
    #[error("command must not be empty")]
    EmptyCommand,

    /// The process could not be spawned. The record has been rolled back.
    #[error("script failed to start: {0}")]
    StartFailure(String),

    /// Stop was requested for an ID without an active process.
    #[error("no such running script: {0}")]
    NoSuchRunningScript(DbId),

    /// The ID does not exist in the store.
    #[error("no such script: {0}")]
    NoSuchScript(DbId),

    /// A durable write or read failed.
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for ScriptError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => Self::NoSuchScript(id),
            other => Self::Store(other),
        }
    }
}
