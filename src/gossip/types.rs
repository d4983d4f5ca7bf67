use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity and static topology of a replication node.
///
/// Peers are fixed for the lifetime of the process; there is no discovery or failure
/// detection. A peer is either a base URL (`http://host:port`) or a bare `host:port`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeDescriptor {
    pub id: NodeId,
    pub address: String,
    pub peers: Vec<String>,
}

impl NodeDescriptor {
    pub fn new(id: NodeId, address: impl Into<String>, peers: Vec<String>) -> Self {
        Self {
            id,
            address: address.into(),
            peers,
        }
    }
}

/// Normalizes a peer entry into a base URL without trailing slash.
pub fn peer_base_url(peer: &str) -> String {
    let trimmed = peer.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    }
}
