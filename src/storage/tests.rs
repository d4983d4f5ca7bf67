//! Storage Module Tests
//!
//! Validates the cache discipline against in-process backing stores.
//!
//! ## Test Scopes
//! - **Write-through**: mutations reach the backing store, failures degrade gracefully.
//! - **Lazy load**: misses populate the map exactly once, even under concurrency.
//! - **Merge**: snapshots only add or overwrite, and never persist.
//! - **Warm start**: bulk load with per-key failure isolation.

#[cfg(test)]
mod tests {
    use crate::storage::backing::{BackingStore, MemoryBackingStore};
    use crate::storage::cache::{ReplicatedCache, Snapshot};
    use crate::storage::warm::{WarmStartReport, warm_start};
    use anyhow::Result;
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Backing store whose every operation fails.
    struct FailingStore;

    #[async_trait]
    impl BackingStore for FailingStore {
        async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>> {
            Err(anyhow::anyhow!("backing store unavailable"))
        }
        async fn set(&self, _key: &str, _value: Vec<u8>) -> Result<()> {
            Err(anyhow::anyhow!("backing store unavailable"))
        }
        async fn delete(&self, _key: &str) -> Result<()> {
            Err(anyhow::anyhow!("backing store unavailable"))
        }
        async fn list_keys(&self, _pattern: &str) -> Result<Vec<String>> {
            Err(anyhow::anyhow!("backing store unavailable"))
        }
    }

    /// Memory store that counts calls and delays reads, to widen race windows.
    struct CountingStore {
        inner: MemoryBackingStore,
        gets: AtomicUsize,
        sets: AtomicUsize,
        read_delay: Duration,
    }

    impl CountingStore {
        fn with_read_delay(read_delay: Duration) -> Self {
            Self {
                inner: MemoryBackingStore::new(),
                gets: AtomicUsize::new(0),
                sets: AtomicUsize::new(0),
                read_delay,
            }
        }
    }

    impl Default for CountingStore {
        fn default() -> Self {
            Self::with_read_delay(Duration::from_millis(20))
        }
    }

    #[async_trait]
    impl BackingStore for CountingStore {
        async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.read_delay).await;
            self.inner.get(key).await
        }
        async fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
            self.sets.fetch_add(1, Ordering::SeqCst);
            self.inner.set(key, value).await
        }
        async fn delete(&self, key: &str) -> Result<()> {
            self.inner.delete(key).await
        }
        async fn list_keys(&self, pattern: &str) -> Result<Vec<String>> {
            self.inner.list_keys(pattern).await
        }
    }

    fn cache_over(store: Arc<dyn BackingStore>) -> ReplicatedCache<Value> {
        ReplicatedCache::new(store)
    }

    async fn backing_value(store: &dyn BackingStore, key: &str) -> Option<Value> {
        store
            .get(key)
            .await
            .unwrap()
            .map(|bytes| serde_json::from_slice(&bytes).unwrap())
    }

    // ============================================================
    // WRITE-THROUGH
    // ============================================================

    #[tokio::test]
    async fn test_insert_writes_through() {
        let store = Arc::new(MemoryBackingStore::new());
        let cache = cache_over(store.clone());

        cache.insert("42", json!({"name": "Ana"})).await;

        assert_eq!(cache.query("42").await, Some(json!({"name": "Ana"})));
        assert_eq!(
            backing_value(&*store, "42").await,
            Some(json!({"name": "Ana"}))
        );
        assert_eq!(cache.stats().backing_failures, 0);
    }

    #[tokio::test]
    async fn test_insert_survives_backing_failure() {
        let cache = cache_over(Arc::new(FailingStore));

        cache.insert("k", json!(1)).await;

        // In-memory portion succeeds, the failure is only recorded
        assert_eq!(cache.query("k").await, Some(json!(1)));
        assert_eq!(cache.count().await, 1);
        assert_eq!(cache.stats().backing_failures, 1);
    }

    #[tokio::test]
    async fn test_update_absent_key_is_noop() {
        let store = Arc::new(CountingStore::default());
        let cache = cache_over(store.clone());

        let applied = cache.update("ghost", json!("boo")).await;

        assert!(!applied);
        assert_eq!(cache.count().await, 0);
        assert_eq!(store.sets.load(Ordering::SeqCst), 0);
        assert!(store.inner.is_empty());
    }

    #[tokio::test]
    async fn test_update_does_not_revive_backing_only_key() {
        let store = Arc::new(MemoryBackingStore::new());
        store.set("7", b"\"old\"".to_vec()).await.unwrap();
        let cache = cache_over(store.clone());

        assert!(!cache.update("7", json!("new")).await);
        assert_eq!(backing_value(&*store, "7").await, Some(json!("old")));
    }

    #[tokio::test]
    async fn test_update_present_key_writes_through() {
        let store = Arc::new(MemoryBackingStore::new());
        let cache = cache_over(store.clone());
        cache.insert("k", json!({"v": 1})).await;

        assert!(cache.update("k", json!({"v": 2})).await);

        assert_eq!(cache.query("k").await, Some(json!({"v": 2})));
        assert_eq!(backing_value(&*store, "k").await, Some(json!({"v": 2})));
    }

    #[tokio::test]
    async fn test_delete_removes_from_both_layers() {
        let store = Arc::new(MemoryBackingStore::new());
        let cache = cache_over(store.clone());
        cache.insert("k", json!(true)).await;

        assert!(cache.delete("k").await);

        assert_eq!(cache.count().await, 0);
        assert!(store.is_empty());
        assert_eq!(cache.query("k").await, None);
    }

    #[tokio::test]
    async fn test_delete_reaches_backing_only_key() {
        let store = Arc::new(MemoryBackingStore::new());
        store.set("only-durable", b"1".to_vec()).await.unwrap();
        let cache = cache_over(store.clone());

        assert!(!cache.delete("only-durable").await);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_delete_backing_failure_keeps_memory_removal() {
        let cache = cache_over(Arc::new(FailingStore));
        cache.insert("k", json!(1)).await;

        assert!(cache.delete("k").await);

        assert_eq!(cache.count().await, 0);
        // one failure from the insert, one from the delete
        assert_eq!(cache.stats().backing_failures, 2);
    }

    // ============================================================
    // LAZY LOAD
    // ============================================================

    #[tokio::test]
    async fn test_query_lazy_loads_backing_only_key() {
        let store = Arc::new(MemoryBackingStore::new());
        store
            .set("99", serde_json::to_vec(&json!({"name": "Bo"})).unwrap())
            .await
            .unwrap();
        let cache = cache_over(store);
        assert_eq!(cache.count().await, 0);

        assert_eq!(cache.query("99").await, Some(json!({"name": "Bo"})));
        assert_eq!(cache.count().await, 1);

        // Second read is a plain hit
        assert_eq!(cache.query("99").await, Some(json!({"name": "Bo"})));
        let stats = cache.stats();
        assert_eq!(stats.lazy_loads, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_misses_fetch_once() {
        let store = Arc::new(CountingStore::default());
        store.inner.set("hot", b"\"value\"".to_vec()).await.unwrap();
        let cache = Arc::new(cache_over(store.clone()));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move { cache.query("hot").await }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap(), Some(json!("value")));
        }

        assert_eq!(store.gets.load(Ordering::SeqCst), 1);
        assert_eq!(cache.count().await, 1);
        assert_eq!(cache.stats().lazy_loads, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_delete_during_lazy_load_stays_deleted() {
        let store = Arc::new(CountingStore::with_read_delay(Duration::from_millis(100)));
        store.inner.set("k", b"\"v\"".to_vec()).await.unwrap();
        let cache = Arc::new(cache_over(store.clone()));

        let loader = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.query("k").await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        // Waits for the in-flight load, then removes what it populated
        cache.delete("k").await;

        assert_eq!(loader.await.unwrap(), Some(json!("v")));
        assert_eq!(cache.count().await, 0);
        assert!(store.inner.is_empty());
        assert_eq!(cache.query("k").await, None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_insert_during_lazy_load_wins() {
        let store = Arc::new(CountingStore::with_read_delay(Duration::from_millis(100)));
        store.inner.set("k", b"\"old\"".to_vec()).await.unwrap();
        let cache = Arc::new(cache_over(store.clone()));

        let loader = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.query("k").await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        cache.insert("k", json!("new")).await;

        // The fetched "old" must not replace the fresher entry
        assert_eq!(loader.await.unwrap(), Some(json!("new")));
        assert_eq!(cache.query("k").await, Some(json!("new")));
        assert_eq!(backing_value(&store.inner, "k").await, Some(json!("new")));
        assert_eq!(cache.stats().lazy_loads, 1);
    }

    #[tokio::test]
    async fn test_query_missing_everywhere_is_not_found() {
        let cache = cache_over(Arc::new(MemoryBackingStore::new()));

        assert_eq!(cache.query("nope").await, None);
        assert_eq!(cache.count().await, 0);
    }

    #[tokio::test]
    async fn test_query_undecodable_backing_value_is_not_found() {
        let store = Arc::new(MemoryBackingStore::new());
        store.set("bad", b"{not json".to_vec()).await.unwrap();
        let cache = cache_over(store);

        assert_eq!(cache.query("bad").await, None);
        assert_eq!(cache.count().await, 0);
    }

    #[tokio::test]
    async fn test_query_backing_failure_is_not_found() {
        let cache = cache_over(Arc::new(FailingStore));

        assert_eq!(cache.query("k").await, None);
        assert_eq!(cache.stats().backing_failures, 1);
    }

    // ============================================================
    // SNAPSHOT & MERGE
    // ============================================================

    #[tokio::test]
    async fn test_snapshot_copies_memory_entries_only() {
        let store = Arc::new(MemoryBackingStore::new());
        store.set("durable", b"0".to_vec()).await.unwrap();
        let cache = cache_over(store);
        cache.insert("a", json!(1)).await;
        cache.insert("b", json!(2)).await;

        let snapshot = cache.snapshot_all().await;

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.get("a"), Some(&json!(1)));
        assert!(!snapshot.contains_key("durable"));
    }

    #[tokio::test]
    async fn test_merge_never_deletes_and_overwrites() {
        let cache = cache_over(Arc::new(MemoryBackingStore::new()));
        cache.insert("keep", json!("local")).await;
        cache.insert("shared", json!("local")).await;

        let mut incoming: Snapshot<Value> = Snapshot::new();
        incoming.insert("shared".to_string(), json!("remote"));
        incoming.insert("new".to_string(), json!("remote"));

        let merged = cache.merge_snapshot(incoming).await;

        assert_eq!(merged, 2);
        let state = cache.snapshot_all().await;
        assert_eq!(state.len(), 3);
        assert_eq!(state["keep"], json!("local"));
        assert_eq!(state["shared"], json!("remote"));
        assert_eq!(state["new"], json!("remote"));
        assert_eq!(cache.stats().merged_keys, 2);
    }

    #[tokio::test]
    async fn test_merge_bypasses_backing_store() {
        let store = Arc::new(CountingStore::default());
        let cache = cache_over(store.clone());

        let mut incoming: Snapshot<Value> = Snapshot::new();
        incoming.insert("x".to_string(), json!(1));
        cache.merge_snapshot(incoming).await;

        assert_eq!(cache.query("x").await, Some(json!(1)));
        assert_eq!(store.sets.load(Ordering::SeqCst), 0);
        assert!(store.inner.is_empty());
    }

    #[tokio::test]
    async fn test_empty_merge_is_harmless() {
        let cache = cache_over(Arc::new(MemoryBackingStore::new()));
        cache.insert("a", json!(1)).await;

        assert_eq!(cache.merge_snapshot(Snapshot::new()).await, 0);
        assert_eq!(cache.count().await, 1);
    }

    // ============================================================
    // WARM START
    // ============================================================

    #[tokio::test]
    async fn test_warm_start_loads_every_key_without_writing_back() {
        let store = Arc::new(CountingStore::default());
        for i in 0..5 {
            store
                .inner
                .set(&i.to_string(), serde_json::to_vec(&json!({"n": i})).unwrap())
                .await
                .unwrap();
        }
        let cache = cache_over(store.clone());

        let report = warm_start(&cache).await;

        assert_eq!(report, WarmStartReport { loaded: 5, skipped: 0 });
        assert_eq!(cache.count().await, 5);
        assert_eq!(store.sets.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_warm_start_skips_undecodable_keys() {
        #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
        struct Named {
            name: String,
        }

        let store = Arc::new(MemoryBackingStore::new());
        store.set("good", br#"{"name":"Ana"}"#.to_vec()).await.unwrap();
        store.set("wrong-shape", b"[1,2,3]".to_vec()).await.unwrap();
        store.set("garbage", b"\xff\xfe".to_vec()).await.unwrap();
        let cache: ReplicatedCache<Named> = ReplicatedCache::new(store);

        let report = warm_start(&cache).await;

        assert_eq!(report, WarmStartReport { loaded: 1, skipped: 2 });
        assert_eq!(
            cache.query("good").await,
            Some(Named {
                name: "Ana".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_warm_start_tolerates_listing_failure() {
        let cache = cache_over(Arc::new(FailingStore));

        let report = warm_start(&cache).await;

        assert_eq!(report, WarmStartReport::default());
        assert_eq!(cache.count().await, 0);
    }

    // ============================================================
    // SCENARIO
    // ============================================================

    #[tokio::test]
    async fn test_insert_query_delete_scenario() {
        let store = Arc::new(MemoryBackingStore::new());
        let cache = cache_over(store.clone());

        cache.insert("42", json!({"name": "Ana"})).await;
        assert_eq!(cache.query("42").await, Some(json!({"name": "Ana"})));

        cache.delete("42").await;
        assert_eq!(cache.query("42").await, None);
        assert_eq!(backing_value(&*store, "42").await, None);
    }
}
