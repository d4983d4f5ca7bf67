//! Gossip Replication Module
//!
//! Propagates cache state between independent nodes with a push-based, full-state,
//! random-peer anti-entropy scheme. This is the only mechanism that makes nodes converge.
//!
//! ## Core Mechanisms
//! - **Push rounds**: a background task sends the whole local snapshot to one random peer
//!   per interval (`node`).
//! - **Merge on receipt**: `POST /gossip/sync` merges the snapshot into memory (`handlers`).
//! - **Static topology**: peers come from configuration; there is no membership protocol,
//!   failure detection, retry or backoff.

pub mod handlers;
pub mod node;
pub mod protocol;
pub mod types;
