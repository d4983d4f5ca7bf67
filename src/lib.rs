//! Gossip-Replicated Key-Value Node Library
//!
//! This library crate defines the modules that make up a single node. The binary
//! (`main.rs`) wires them together behind one HTTP listener.
//!
//! ## Architecture Modules
//! - **`storage`**: The write-through cache. An in-memory map in front of a pluggable
//!   backing store (Redis or in-memory), with lazy loading on misses, warm start from the
//!   backing store, and snapshot/merge hooks for replication.
//! - **`gossip`**: The replication layer. Every interval the node pushes its full cache
//!   snapshot to one random peer over `POST /gossip/sync` and merges whatever it receives.
//! - **`records`**: The student record API served on top of the cache.
//! - **`config`**: Environment and command-line configuration.
//! - **`api`**: JSON envelopes shared by the HTTP handlers.

pub mod api;
pub mod config;
pub mod gossip;
pub mod records;
pub mod storage;
