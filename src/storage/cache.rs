use super::backing::BackingStore;
use super::stats::{CacheStats, CacheStatsSnapshot};

use dashmap::DashMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Full point-in-time copy of a cache, as pushed to peers.
pub type Snapshot<V> = HashMap<String, V>;

/// In-memory key/value map with write-through persistence and lazy loading.
///
/// A single `RwLock` guards the map: reads share it, every mutation (insert, update,
/// delete, merge, lazy populate) takes it exclusively. The lock is never held while
/// talking to the backing store.
pub struct ReplicatedCache<V> {
    entries: RwLock<HashMap<String, V>>,
    /// Per-key guards so concurrent misses on one key trigger a single backing fetch.
    loading: DashMap<String, Arc<Mutex<()>>>,
    backing: Arc<dyn BackingStore>,
    stats: CacheStats,
}

impl<V> ReplicatedCache<V>
where
    V: Clone + Serialize + DeserializeOwned + Send + Sync,
{
    pub fn new(backing: Arc<dyn BackingStore>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            loading: DashMap::new(),
            backing,
            stats: CacheStats::new(),
        }
    }

    /// Stores `value` in memory, then persists it.
    ///
    /// A failed backing write is logged and counted; the in-memory entry stays.
    pub async fn insert(&self, key: impl Into<String>, value: V) {
        let key = key.into();
        let encoded = serde_json::to_vec(&value);

        self.entries.write().await.insert(key.clone(), value);

        self.write_through(&key, encoded).await;
    }

    /// Like [`insert`](Self::insert) but only if `key` is already in memory.
    ///
    /// Keys that exist only in the backing store are not revived. Returns whether the
    /// update was applied.
    pub async fn update(&self, key: &str, value: V) -> bool {
        let encoded = serde_json::to_vec(&value);

        {
            let mut entries = self.entries.write().await;
            match entries.get_mut(key) {
                Some(slot) => *slot = value,
                None => {
                    tracing::debug!("UPDATE: key {} not in memory, skipping", key);
                    return false;
                }
            }
        }

        self.write_through(key, encoded).await;
        true
    }

    /// Removes `key` from memory and issues a backing delete.
    ///
    /// The backing delete is sent even when the key was not in memory. Returns whether
    /// an in-memory entry was removed. Waits for an in-flight lazy load of the same key,
    /// so a stale fetch cannot repopulate the entry afterwards.
    pub async fn delete(&self, key: &str) -> bool {
        let guard = self.key_guard(key);
        let removed = {
            let _loading = guard.lock().await;

            let removed = self.entries.write().await.remove(key).is_some();

            if let Err(e) = self.backing.delete(key).await {
                self.stats.record_backing_failure();
                tracing::error!("Failed to delete key {} from backing store: {}", key, e);
            }
            removed
        };

        self.release_guard(key, &guard);
        removed
    }

    /// Returns the value for `key`, loading it from the backing store on a miss.
    ///
    /// Backing-store misses, I/O failures and undecodable values all yield `None`.
    pub async fn query(&self, key: &str) -> Option<V> {
        let cached = self.entries.read().await.get(key).cloned();
        if let Some(value) = cached {
            self.stats.record_hit();
            return Some(value);
        }

        self.stats.record_miss();
        self.lazy_load(key).await
    }

    async fn lazy_load(&self, key: &str) -> Option<V> {
        let guard = self.key_guard(key);
        let result = {
            let _loading = guard.lock().await;
            self.load_locked(key).await
        };

        self.release_guard(key, &guard);
        result
    }

    /// Second half of a lazy load, run while holding the key guard.
    async fn load_locked(&self, key: &str) -> Option<V> {
        // Another task may have finished the same load while we waited.
        let cached = self.entries.read().await.get(key).cloned();
        match cached {
            Some(value) => Some(value),
            None => match self.fetch_from_backing(key).await {
                Some(value) => {
                    let mut entries = self.entries.write().await;
                    // A concurrent insert or merge wins over what we just read.
                    let stored = entries.entry(key.to_string()).or_insert(value).clone();
                    self.stats.record_lazy_load();
                    tracing::debug!("QUERY: lazily loaded key {}", key);
                    Some(stored)
                }
                None => None,
            },
        }
    }

    /// Per-key guard shared by lazy loads and deletes of that key.
    fn key_guard(&self, key: &str) -> Arc<Mutex<()>> {
        self.loading
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drops the map's guard once no other task holds or waits on it. The count is
    /// stable inside `remove_if` since new holders clone it under the same shard lock.
    fn release_guard(&self, key: &str, guard: &Arc<Mutex<()>>) {
        self.loading.remove_if(key, |_, current| {
            Arc::ptr_eq(current, guard) && Arc::strong_count(current) == 2
        });
    }

    async fn fetch_from_backing(&self, key: &str) -> Option<V> {
        match self.backing.get(key).await {
            Ok(Some(bytes)) => match serde_json::from_slice::<V>(&bytes) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::warn!("Failed to decode backing value for key {}: {}", key, e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                self.stats.record_backing_failure();
                tracing::error!("Failed to load key {} from backing store: {}", key, e);
                None
            }
        }
    }

    async fn write_through(&self, key: &str, encoded: serde_json::Result<Vec<u8>>) {
        let bytes = match encoded {
            Ok(bytes) => bytes,
            Err(e) => {
                self.stats.record_backing_failure();
                tracing::error!("Failed to encode value for key {}: {}", key, e);
                return;
            }
        };

        if let Err(e) = self.backing.set(key, bytes).await {
            self.stats.record_backing_failure();
            tracing::error!("Failed to write key {} to backing store: {}", key, e);
        }
    }

    /// Number of in-memory entries. Keys held only by the backing store are not counted.
    pub async fn count(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Copies every in-memory entry.
    pub async fn snapshot_all(&self) -> Snapshot<V> {
        self.entries.read().await.clone()
    }

    /// Inserts or overwrites every entry of `snapshot` in memory only.
    ///
    /// Never removes keys and never touches the backing store. Returns the number of
    /// keys written.
    pub async fn merge_snapshot(&self, snapshot: Snapshot<V>) -> usize {
        let merged = snapshot.len();

        self.entries.write().await.extend(snapshot);

        self.stats.record_merged(merged as u64);
        merged
    }

    /// Places an entry in memory without writing through. Used by the warm-start loader
    /// for values that already live in the backing store.
    pub(crate) async fn populate(&self, key: String, value: V) {
        self.entries.write().await.insert(key, value);
    }

    pub(crate) fn backing(&self) -> &Arc<dyn BackingStore> {
        &self.backing
    }

    pub fn stats(&self) -> CacheStatsSnapshot {
        self.stats.snapshot()
    }
}
