//! Valkey / Redis cache adapter
//!
//! Uses a multiplexed `ConnectionManager`, which reconnects on its own after
//! a dropped connection, so a single handle is shared by all requests.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::sync::Mutex;
use std::time::Duration;
use tracing::info;

use super::{Cache, CacheError};

pub struct ValkeyCache {
    conn: Mutex<Option<ConnectionManager>>,
}

impl ValkeyCache {
    /// Connect and ping the server before handing out the cache.
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(url)?;
        let mut conn = client.get_connection_manager().await?;

        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        info!(reply = %pong, "Valkey cache connected");

        Ok(Self {
            conn: Mutex::new(Some(conn)),
        })
    }

    fn connection(&self) -> Result<ConnectionManager, CacheError> {
        let guard = match self.conn.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.clone().ok_or(CacheError::Closed)
    }
}

#[async_trait]
impl Cache for ValkeyCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.connection()?;
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.connection()?;
        if ttl.is_zero() {
            let _: () = conn.set(key, value).await?;
        } else {
            // PSETEX rejects 0, so sub-millisecond TTLs round up
            let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
            let _: () = conn.pset_ex(key, value, millis).await?;
        }
        Ok(())
    }

    async fn close(&self) {
        let mut guard = match self.conn.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.take();
    }
}
