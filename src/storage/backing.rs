//! Backing Store Adapters
//!
//! Durable key/value persistence sitting behind the in-memory cache. Values cross this
//! boundary as JSON-encoded bytes; the adapters never interpret them.

use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;

/// Pattern matching every key, used by the warm-start loader.
pub const MATCH_ALL: &str = "*";

/// Durable key/value service the cache writes through to and lazily loads from.
///
/// Implementations are shared across tasks, so they must synchronize internally.
#[async_trait]
pub trait BackingStore: Send + Sync {
    /// Fetches the raw bytes stored under `key`, `None` if the key is absent.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Stores `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()>;

    /// Removes `key`. Deleting an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Lists every key matching a Redis-style glob (`*` and `?`).
    async fn list_keys(&self, pattern: &str) -> Result<Vec<String>>;
}

/// In-process adapter used when no Redis address is configured.
#[derive(Default)]
pub struct MemoryBackingStore {
    data: DashMap<String, Vec<u8>>,
}

impl MemoryBackingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[async_trait]
impl BackingStore for MemoryBackingStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.data.get(key).map(|entry| entry.value().clone()))
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.data.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.data.remove(key);
        Ok(())
    }

    async fn list_keys(&self, pattern: &str) -> Result<Vec<String>> {
        Ok(self
            .data
            .iter()
            .filter(|entry| glob_match(pattern, entry.key()))
            .map(|entry| entry.key().clone())
            .collect())
    }
}

/// Matches `text` against a glob where `*` is any run of characters and `?` exactly one.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();

    let (mut p, mut t) = (0usize, 0usize);
    let mut star: Option<usize> = None;
    let mut resume = 0usize;

    while t < text.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == text[t]) {
            p += 1;
            t += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            star = Some(p);
            resume = t;
            p += 1;
        } else if let Some(star_idx) = star {
            // backtrack: let the last star swallow one more character
            p = star_idx + 1;
            resume += 1;
            t = resume;
        } else {
            return false;
        }
    }

    while p < pattern.len() && pattern[p] == '*' {
        p += 1;
    }

    p == pattern.len()
}
