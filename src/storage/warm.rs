//! Warm-Start Loader
//!
//! Copies the whole backing store into memory once, before the node accepts traffic or
//! starts gossiping. Values are placed directly in the map since they are already durable.

use super::backing::MATCH_ALL;
use super::cache::ReplicatedCache;

use serde::Serialize;
use serde::de::DeserializeOwned;

/// Outcome of a warm start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WarmStartReport {
    pub loaded: usize,
    pub skipped: usize,
}

/// Loads every backing-store key into `cache`. Individual failures are logged and
/// skipped; the loader never fails the startup sequence.
pub async fn warm_start<V>(cache: &ReplicatedCache<V>) -> WarmStartReport
where
    V: Clone + Serialize + DeserializeOwned + Send + Sync,
{
    let backing = cache.backing().clone();
    let mut report = WarmStartReport::default();

    let keys = match backing.list_keys(MATCH_ALL).await {
        Ok(keys) => keys,
        Err(e) => {
            tracing::error!("Warm start: failed to list backing keys: {}", e);
            return report;
        }
    };

    tracing::info!("Warm start: {} keys in backing store", keys.len());

    for key in keys {
        let bytes = match backing.get(&key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                // deleted between list and get
                report.skipped += 1;
                continue;
            }
            Err(e) => {
                tracing::warn!("Warm start: failed to fetch key {}: {}", key, e);
                report.skipped += 1;
                continue;
            }
        };

        match serde_json::from_slice::<V>(&bytes) {
            Ok(value) => {
                cache.populate(key, value).await;
                report.loaded += 1;
            }
            Err(e) => {
                tracing::warn!("Warm start: skipping undecodable key {}: {}", key, e);
                report.skipped += 1;
            }
        }
    }

    report
}
