//! Node Configuration
//!
//! Settings are read from environment variables first, then overridden by command-line
//! flags. An invalid value is the only fatal startup error.
//!
//! | Variable                | Flag            | Default             |
//! |-------------------------|-----------------|---------------------|
//! | `NODE_ID`               | `--id`          | random UUID         |
//! | `NODE_ADDRESS`          | `--address`     | `http://<bind>`     |
//! | `PEERS` (comma list)    | `--peer` (rep.) | none                |
//! | `PORT`                  | `--bind`        | `0.0.0.0:8080`      |
//! | `REDIS_ADDRESS`         |                 | in-memory store     |
//! | `REDIS_PASSWORD`        |                 | none                |
//! | `REDIS_DB`              |                 | `0`                 |
//! | `GOSSIP_INTERVAL_MS`    | `--interval-ms` | `5000`              |
//! | `CONSISTENCY_ALGORITHM` |                 | `gossip`            |

use crate::gossip::node::DEFAULT_GOSSIP_INTERVAL;
use crate::gossip::types::{NodeDescriptor, NodeId};
use crate::storage::redis_store::redis_url;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_PORT: u16 = 8080;

/// Replication strategy selected at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConsistencyAlgorithm {
    #[default]
    Gossip,
    /// Accepted for configuration compatibility; no replication runs.
    Raft,
}

impl FromStr for ConsistencyAlgorithm {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gossip" => Ok(Self::Gossip),
            "raft" => Ok(Self::Raft),
            other => Err(anyhow::anyhow!("Unknown consistency algorithm: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedisConfig {
    pub address: String,
    pub password: Option<String>,
    pub db: i64,
}

impl RedisConfig {
    pub fn url(&self) -> String {
        redis_url(&self.address, self.password.as_deref(), self.db)
    }
}

#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub node_id: NodeId,
    pub node_address: String,
    pub peers: Vec<String>,
    pub bind_addr: SocketAddr,
    /// `None` selects the in-memory backing store.
    pub redis: Option<RedisConfig>,
    pub gossip_interval: Duration,
    pub consistency: ConsistencyAlgorithm,
}

impl NodeConfig {
    /// Reads the process environment, then applies `args` (without the program name).
    pub fn load(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut config = Self::from_lookup(|key| std::env::var(key).ok())?;
        config.apply_args(args)?;
        Ok(config)
    }

    /// Builds a configuration from an environment-style lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let port: u16 = match var("PORT") {
            Some(port) => port.trim().parse().context("PORT must be a port number")?,
            None => DEFAULT_PORT,
        };
        let bind_addr = SocketAddr::from(([0, 0, 0, 0], port));

        let gossip_interval = match var("GOSSIP_INTERVAL_MS") {
            Some(ms) => parse_interval_ms(&ms)?,
            None => DEFAULT_GOSSIP_INTERVAL,
        };

        let consistency = match var("CONSISTENCY_ALGORITHM") {
            Some(name) => name.parse()?,
            None => ConsistencyAlgorithm::default(),
        };

        let redis = match var("REDIS_ADDRESS") {
            Some(address) => Some(RedisConfig {
                address: address.trim().to_string(),
                password: var("REDIS_PASSWORD"),
                db: match var("REDIS_DB") {
                    Some(db) => db.trim().parse().context("REDIS_DB must be an integer")?,
                    None => 0,
                },
            }),
            None => None,
        };

        Ok(Self {
            node_id: var("NODE_ID").map(NodeId).unwrap_or_default(),
            node_address: var("NODE_ADDRESS").unwrap_or_else(|| format!("http://{}", bind_addr)),
            peers: var("PEERS").map(|raw| split_peers(&raw)).unwrap_or_default(),
            bind_addr,
            redis,
            gossip_interval,
            consistency,
        })
    }

    /// Applies `--id`, `--bind`, `--address`, `--peer` and `--interval-ms` overrides.
    /// Any `--peer` replaces the peers read from the environment.
    pub fn apply_args(&mut self, args: impl IntoIterator<Item = String>) -> Result<()> {
        let mut args = args.into_iter();
        let mut cli_peers: Vec<String> = vec![];

        while let Some(flag) = args.next() {
            let mut value = || {
                args.next()
                    .with_context(|| format!("Missing value for {}", flag))
            };
            match flag.as_str() {
                "--id" => self.node_id = NodeId(value()?),
                "--bind" => {
                    self.bind_addr = value()?.parse().context("--bind expects <addr:port>")?;
                }
                "--address" => self.node_address = value()?,
                "--peer" => cli_peers.push(value()?),
                "--interval-ms" => self.gossip_interval = parse_interval_ms(&value()?)?,
                other => tracing::warn!("Ignoring unknown argument {}", other),
            }
        }

        if !cli_peers.is_empty() {
            self.peers = cli_peers;
        }
        Ok(())
    }

    pub fn descriptor(&self) -> NodeDescriptor {
        NodeDescriptor::new(
            self.node_id.clone(),
            self.node_address.clone(),
            self.peers.clone(),
        )
    }
}

fn split_peers(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|peer| !peer.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_interval_ms(raw: &str) -> Result<Duration> {
    let ms: u64 = raw
        .trim()
        .parse()
        .context("gossip interval must be a number of milliseconds")?;
    if ms == 0 {
        return Err(anyhow::anyhow!("gossip interval must be greater than zero"));
    }
    Ok(Duration::from_millis(ms))
}
