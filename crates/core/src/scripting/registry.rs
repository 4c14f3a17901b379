//! Registry of live script processes.
//!
//! [`ProcessRegistry`] is pure storage: it maps execution IDs to
//! [`ProcessHandle`]s behind a read/write lock and holds no lifecycle logic.
//! The underlying map is pluggable through [`RegistryBacking`].

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use super::handle::ProcessHandle;
use crate::types::DbId;

/// Key/value storage behind a [`ProcessRegistry`].
///
/// Implementations need no internal synchronization; the registry
/// serializes writers and allows concurrent readers.
pub trait RegistryBacking<V>: Send + Sync {
    /// Insert or overwrite `key`. `ttl = None` never expires.
    fn set(&mut self, key: DbId, value: V, ttl: Option<Duration>);

    fn get(&self, key: DbId) -> Option<V>;

    fn delete(&mut self, key: DbId);

    /// Keys of all live entries.
    fn keys(&self) -> Vec<DbId>;
}

/// Non-expiring backing. Handles live exactly as long as their process, so
/// this is the one the orchestrator uses.
#[derive(Debug)]
pub struct MapBacking<V> {
    entries: HashMap<DbId, V>,
}

impl<V> Default for MapBacking<V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<V: Clone + Send + Sync> RegistryBacking<V> for MapBacking<V> {
    fn set(&mut self, key: DbId, value: V, _ttl: Option<Duration>) {
        self.entries.insert(key, value);
    }

    fn get(&self, key: DbId) -> Option<V> {
        self.entries.get(&key).cloned()
    }

    fn delete(&mut self, key: DbId) {
        self.entries.remove(&key);
    }

    fn keys(&self) -> Vec<DbId> {
        self.entries.keys().copied().collect()
    }
}

/// Backing whose entries may carry a deadline.
///
/// Expired entries read as absent and are purged on the next write.
#[derive(Debug)]
pub struct ExpiringBacking<V> {
    entries: HashMap<DbId, (V, Option<Instant>)>,
}

impl<V> Default for ExpiringBacking<V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<V> ExpiringBacking<V> {
    fn purge_expired(&mut self, now: Instant) {
        self.entries
            .retain(|_, (_, expires)| expires.map_or(true, |at| at > now));
    }
}

impl<V: Clone + Send + Sync> RegistryBacking<V> for ExpiringBacking<V> {
    fn set(&mut self, key: DbId, value: V, ttl: Option<Duration>) {
        let now = Instant::now();
        self.purge_expired(now);
        self.entries.insert(key, (value, ttl.map(|ttl| now + ttl)));
    }

    fn get(&self, key: DbId) -> Option<V> {
        let now = Instant::now();
        match self.entries.get(&key) {
            Some((value, expires)) if expires.map_or(true, |at| at > now) => Some(value.clone()),
            _ => None,
        }
    }

    fn delete(&mut self, key: DbId) {
        self.purge_expired(Instant::now());
        self.entries.remove(&key);
    }

    fn keys(&self) -> Vec<DbId> {
        let now = Instant::now();
        self.entries
            .iter()
            .filter(|(_, (_, expires))| expires.map_or(true, |at| at > now))
            .map(|(key, _)| *key)
            .collect()
    }
}

/// Concurrency-safe table of running processes, keyed by script ID.
///
/// Lookups take the read lock; register / unregister take the write lock.
/// Designed to be wrapped in `Arc` and injected into the orchestrator.
pub struct ProcessRegistry {
    backing: RwLock<Box<dyn RegistryBacking<ProcessHandle>>>,
}

impl ProcessRegistry {
    /// Registry over a non-expiring [`MapBacking`].
    pub fn new() -> Self {
        Self::with_backing(MapBacking::default())
    }

    pub fn with_backing<B>(backing: B) -> Self
    where
        B: RegistryBacking<ProcessHandle> + 'static,
    {
        Self {
            backing: RwLock::new(Box::new(backing)),
        }
    }

    /// Publish `handle` under `id`, overwriting any previous entry.
    pub async fn register(&self, id: DbId, handle: ProcessHandle) {
        let mut backing = self.backing.write().await;
        if backing.get(id).is_some() {
            tracing::warn!(script_id = id, "Overwriting existing registry entry");
        }
        backing.set(id, handle, None);
    }

    pub async fn lookup(&self, id: DbId) -> Option<ProcessHandle> {
        self.backing.read().await.get(id)
    }

    /// Remove the entry for `id`. Absent IDs are a no-op.
    pub async fn unregister(&self, id: DbId) {
        self.backing.write().await.delete(id);
    }

    /// IDs of every registered process.
    pub async fn ids(&self) -> Vec<DbId> {
        let mut ids = self.backing.read().await.keys();
        ids.sort_unstable();
        ids
    }

    pub async fn len(&self) -> usize {
        self.backing.read().await.keys().len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for ProcessRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
