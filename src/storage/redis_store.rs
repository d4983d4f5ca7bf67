//! Redis Backing Store
//!
//! Production adapter. All calls share one multiplexed connection; each operation clones
//! the handle, which is cheap and lets concurrent requests pipeline on the same socket.

use super::backing::BackingStore;

use anyhow::Result;
use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;

pub struct RedisBackingStore {
    connection: MultiplexedConnection,
}

impl RedisBackingStore {
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let connection = client.get_multiplexed_async_connection().await?;
        tracing::info!("Connected to Redis backing store");
        Ok(Self { connection })
    }
}

#[async_trait]
impl BackingStore for RedisBackingStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.connection.clone();
        let value: Option<Vec<u8>> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        let mut conn = self.connection.clone();
        conn.set::<_, _, ()>(key, value).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.connection.clone();
        conn.del::<_, ()>(key).await?;
        Ok(())
    }

    async fn list_keys(&self, pattern: &str) -> Result<Vec<String>> {
        let mut conn = self.connection.clone();
        let keys: Vec<String> = conn.keys(pattern).await?;
        Ok(keys)
    }
}

/// Builds a `redis://` URL from the address/password/db triple used in node configuration.
pub fn redis_url(address: &str, password: Option<&str>, db: i64) -> String {
    match password {
        Some(password) if !password.is_empty() => {
            format!("redis://:{}@{}/{}", password, address, db)
        }
        _ => format!("redis://{}/{}", address, db),
    }
}
