//! Replication Node
//!
//! Push-based, full-state, random-peer gossip. Every interval the node snapshots its cache
//! and POSTs it to one peer picked uniformly at random; inbound snapshots are merged into
//! the local cache. Failures are logged and the next round proceeds independently.
//!
//! ## Guarantees
//! - Merges only insert or overwrite, so deletes do not propagate and may resurrect.
//! - The last snapshot received wins at each node; concurrent writes can diverge forever.

use super::protocol::ENDPOINT_GOSSIP_SYNC;
use super::types::{NodeDescriptor, peer_base_url};
use crate::storage::cache::{ReplicatedCache, Snapshot};

use anyhow::Result;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

pub const DEFAULT_GOSSIP_INTERVAL: Duration = Duration::from_secs(5);

pub struct GossipNode<V> {
    pub descriptor: NodeDescriptor,
    cache: Arc<ReplicatedCache<V>>,
    http_client: reqwest::Client,
    interval: Duration,
}

impl<V> GossipNode<V>
where
    V: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    pub fn new(
        descriptor: NodeDescriptor,
        cache: Arc<ReplicatedCache<V>>,
        interval: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            descriptor,
            cache,
            // No request timeout: a stalled peer stalls only the gossip task.
            http_client: reqwest::Client::new(),
            interval: interval.max(Duration::from_millis(1)),
        })
    }

    pub fn cache(&self) -> &Arc<ReplicatedCache<V>> {
        &self.cache
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Picks one peer uniformly at random, `None` when the peer list is empty.
    pub fn pick_peer(&self) -> Option<&str> {
        use rand::Rng;

        let peers = &self.descriptor.peers;
        if peers.is_empty() {
            return None;
        }
        let idx = rand::thread_rng().gen_range(0..peers.len());
        Some(peers[idx].as_str())
    }

    /// Pushes a full snapshot of the local cache to `peer`.
    ///
    /// The snapshot is copied out before any network I/O. Transport errors and non-2xx
    /// responses are returned as errors.
    pub async fn sync_with_peer(&self, peer: &str) -> Result<()> {
        let snapshot = self.cache.snapshot_all().await;
        let entries = snapshot.len();
        let url = format!("{}{}", peer_base_url(peer), ENDPOINT_GOSSIP_SYNC);

        let response = self.http_client.post(url).json(&snapshot).send().await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(anyhow::anyhow!(
                "Peer {} rejected sync ({}): {}",
                peer,
                status,
                body
            ));
        }

        tracing::debug!("Pushed {} entries to peer {}", entries, peer);
        Ok(())
    }

    /// One gossip tick: pick a peer and push. Never fails; errors are logged.
    pub async fn gossip_round(&self) {
        let Some(peer) = self.pick_peer() else {
            tracing::trace!("No peers configured, skipping gossip round");
            return;
        };

        if let Err(e) = self.sync_with_peer(peer).await {
            tracing::error!("Error syncing with peer {}: {}", peer, e);
        }
    }

    /// Merges a snapshot pushed by a peer. Returns the number of keys written.
    pub async fn receive_snapshot(&self, snapshot: Snapshot<V>) -> usize {
        let merged = self.cache.merge_snapshot(snapshot).await;
        tracing::debug!("Node {} merged {} entries from peer", self.descriptor.id, merged);
        merged
    }

    /// Spawns the gossip loop. The first push happens one interval after start.
    ///
    /// The loop runs until [`GossipHandle::stop`] is called or the handle is dropped.
    pub fn start(self: Arc<Self>) -> GossipHandle {
        tracing::info!(
            "Starting gossip for node {} ({} peers, every {:?})",
            self.descriptor.id,
            self.descriptor.peers.len(),
            self.interval
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(async move {
            self.gossip_loop(shutdown_rx).await;
        });

        GossipHandle {
            shutdown: shutdown_tx,
            task,
        }
    }

    async fn gossip_loop(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    // An in-flight push is not cancelled by a stop request.
                    self.gossip_round().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("Gossip loop for node {} stopped", self.descriptor.id);
    }
}

/// Lifecycle handle of a running gossip loop.
pub struct GossipHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl GossipHandle {
    /// Signals the loop to stop and waits for it to exit.
    pub async fn stop(self) {
        // Err only if the loop already exited.
        let _ = self.shutdown.send(true);

        if let Err(e) = self.task.await {
            tracing::error!("Gossip task ended abnormally: {}", e);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
