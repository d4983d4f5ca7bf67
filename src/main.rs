use anyhow::Context;
use axum::Router;
use gossip_kv::config::{ConsistencyAlgorithm, NodeConfig};
use gossip_kv::gossip::handlers::router as gossip_router;
use gossip_kv::gossip::node::{GossipHandle, GossipNode};
use gossip_kv::records::handlers::router as records_router;
use gossip_kv::records::manager::StudentManager;
use gossip_kv::records::types::Student;
use gossip_kv::storage::backing::{BackingStore, MemoryBackingStore};
use gossip_kv::storage::cache::ReplicatedCache;
use gossip_kv::storage::redis_store::RedisBackingStore;
use gossip_kv::storage::warm::warm_start;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        // .with_max_level(tracing::Level::DEBUG)
        .with_max_level(tracing::Level::INFO)
        .init();

    let config = NodeConfig::load(std::env::args().skip(1))?;

    tracing::info!("Starting node {} on {}", config.node_id, config.bind_addr);
    if config.peers.is_empty() {
        tracing::info!("No peers configured, replication is idle");
    } else {
        tracing::info!("Peers: {:?}", config.peers);
    }

    // 1. Backing store:
    let backing: Arc<dyn BackingStore> = match &config.redis {
        Some(redis) => {
            tracing::info!("Connecting to Redis at {}", redis.address);
            let store = RedisBackingStore::connect(&redis.url())
                .await
                .with_context(|| format!("Failed to connect to Redis at {}", redis.address))?;
            Arc::new(store)
        }
        None => {
            tracing::warn!("REDIS_ADDRESS not set, using a volatile in-memory backing store");
            Arc::new(MemoryBackingStore::new())
        }
    };

    // 2. Cache + warm start:
    let cache = Arc::new(ReplicatedCache::<Student>::new(backing));
    let report = warm_start(&cache).await;
    tracing::info!(
        "Warm start loaded {} entries ({} skipped)",
        report.loaded,
        report.skipped
    );

    // 3. Replication:
    // Snapshots are typed as `Student`; a peer push with any other value shape gets a 400.
    let node = GossipNode::new(config.descriptor(), cache.clone(), config.gossip_interval);
    let gossip: Option<GossipHandle> = match config.consistency {
        ConsistencyAlgorithm::Gossip => {
            tracing::info!("Using gossip replication every {:?}", node.interval());
            Some(node.clone().start())
        }
        ConsistencyAlgorithm::Raft => {
            tracing::warn!("Raft protocol is not implemented yet, replication is disabled");
            None
        }
    };

    // 4. HTTP Router:
    let manager = Arc::new(StudentManager::new(cache.clone()));
    let app = Router::new()
        .merge(gossip_router(node))
        .merge(records_router(manager));

    // 5. Spawn stats reporter:
    let stats_cache = cache.clone();
    let report_every = config.gossip_interval;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(report_every);

        loop {
            interval.tick().await;
            let stats = stats_cache.stats();
            tracing::info!(
                "Cache stats: {} entries, hits={} misses={} lazy_loads={} backing_failures={} merged={}",
                stats_cache.count().await,
                stats.hits,
                stats.misses,
                stats.lazy_loads,
                stats.backing_failures,
                stats.merged_keys
            );
        }
    });

    // 6. Start HTTP server:
    tracing::info!("HTTP server listening on {}", config.bind_addr);
    tracing::info!("Press Ctrl+C to shutdown");

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await?;

    if let Some(handle) = gossip {
        handle.stop().await;
    }
    tracing::info!("Node {} stopped", config.node_id);

    Ok(())
}
