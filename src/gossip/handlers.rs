use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Extension},
    http::StatusCode,
    routing::{get, post},
};
use serde::{Serialize, de::DeserializeOwned};
use std::sync::Arc;

use super::node::GossipNode;
use super::protocol::{
    ENDPOINT_GOSSIP_STATUS, ENDPOINT_GOSSIP_SYNC, NodeStatusResponse, SYNC_ACK_MESSAGE,
    SYNC_BODY_LIMIT,
};
use crate::api::{ErrorResponse, MessageResponse};
use crate::storage::cache::Snapshot;

/// Routes served by every node regardless of whether its own gossip loop runs.
pub fn router<V>(node: Arc<GossipNode<V>>) -> Router
where
    V: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    Router::new()
        .route(ENDPOINT_GOSSIP_SYNC, post(handle_sync::<V>))
        .route(ENDPOINT_GOSSIP_STATUS, get(handle_status::<V>))
        .layer(DefaultBodyLimit::max(SYNC_BODY_LIMIT))
        .layer(Extension(node))
}

/// Accepts a peer snapshot. The body is decoded as a whole: a single bad value rejects
/// the entire push with 400 and nothing is merged.
pub async fn handle_sync<V>(
    Extension(node): Extension<Arc<GossipNode<V>>>,
    body: Bytes,
) -> Result<(StatusCode, Json<MessageResponse>), (StatusCode, Json<ErrorResponse>)>
where
    V: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    let snapshot: Snapshot<V> = match serde_json::from_slice(&body) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            tracing::warn!("Rejected malformed gossip snapshot: {}", e);
            return Err((StatusCode::BAD_REQUEST, Json(ErrorResponse::new(e))));
        }
    };

    node.receive_snapshot(snapshot).await;

    Ok((StatusCode::OK, Json(MessageResponse::new(SYNC_ACK_MESSAGE))))
}

pub async fn handle_status<V>(
    Extension(node): Extension<Arc<GossipNode<V>>>,
) -> (StatusCode, Json<NodeStatusResponse>)
where
    V: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    let cache = node.cache();
    (
        StatusCode::OK,
        Json(NodeStatusResponse {
            node_id: node.descriptor.id.to_string(),
            address: node.descriptor.address.clone(),
            peers: node.descriptor.peers.clone(),
            entries: cache.count().await,
            stats: cache.stats(),
        }),
    )
}
