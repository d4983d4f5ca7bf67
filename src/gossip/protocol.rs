//! Peer Sync Protocol
//!
//! Endpoints and DTOs exchanged between replication nodes.
//!
//! The sync body is the bare snapshot: a JSON object mapping each key to its value.
//! There is no envelope, version or sender id on the wire.

use crate::storage::stats::CacheStatsSnapshot;

use serde::{Deserialize, Serialize};

// --- API Endpoints ---

/// Endpoint receiving full-state pushes from peers.
pub const ENDPOINT_GOSSIP_SYNC: &str = "/gossip/sync";
/// Diagnostic endpoint describing this node and its cache.
pub const ENDPOINT_GOSSIP_STATUS: &str = "/gossip/status";

/// Upper bound on an inbound snapshot body.
pub const SYNC_BODY_LIMIT: usize = 64 * 1024 * 1024;

/// Acknowledgment text returned for every accepted snapshot.
pub const SYNC_ACK_MESSAGE: &str = "Sync successful";

// --- Data Transfer Objects ---

/// Response of the status endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeStatusResponse {
    pub node_id: String,
    pub address: String,
    pub peers: Vec<String>,
    /// Number of in-memory entries.
    pub entries: usize,
    pub stats: CacheStatsSnapshot,
}
