//! Storage Module
//!
//! Implements the node-local half of the replicated key-value store.
//!
//! ## Core Concepts
//! - **Backing store**: durable key/value service (`BackingStore`), Redis in production.
//! - **Write-through**: every mutation of the in-memory map is mirrored to the backing store.
//! - **Lazy load**: a read miss fetches from the backing store and populates the map.
//! - **Warm start**: at boot the whole backing store is copied into memory.
//!
//! Snapshots taken here are what the `gossip` module pushes to peers.

pub mod backing;
pub mod cache;
pub mod redis_store;
pub mod stats;
pub mod warm;

#[cfg(test)]
mod tests;
