//! Key/value cache port
//!
//! The repository only needs three operations from a cache, so any backend
//! that can store strings with an optional expiry fits behind [`Cache`].
//! Errors from a cache are never fatal to callers: the repository treats
//! them as a miss or a skipped write.

pub mod memory;
pub mod valkey;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

pub use memory::MemoryCache;
pub use valkey::ValkeyCache;

use crate::config::{CacheBackend, CacheConfig};

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(#[from] redis::RedisError),

    #[error("cache is closed")]
    Closed,
}

#[async_trait]
pub trait Cache: Send + Sync {
    /// Return the value stored under `key`, or `None` on a miss or expiry.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Store `value` under `key`. A zero `ttl` means the value never expires.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    /// Release the underlying resources. Later calls fail with [`CacheError::Closed`].
    async fn close(&self);
}

/// Build the configured cache backend and verify it is reachable.
pub async fn connect(cfg: &CacheConfig) -> anyhow::Result<Arc<dyn Cache>> {
    match cfg.backend {
        CacheBackend::Memory => Ok(Arc::new(MemoryCache::new())),
        CacheBackend::Valkey => {
            let cache = ValkeyCache::connect(&cfg.connection_url()?).await?;
            Ok(Arc::new(cache))
        }
    }
}
