//! Log entry repository
//!
//! The relational store is the system of record. An optional cache sits
//! beside it:
//! - `save` writes the store first, then the cache (no expiry)
//! - `get_by_id` reads the cache first and refreshes it from the store on a miss
//! - `all` and `search` always go to the store
//!
//! Store and cache writes are independent. A failed or skipped cache write
//! only leaves a missing or stale value behind, which the next cold read
//! replaces.

pub mod error;
pub mod memory;
pub mod query;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::cache::Cache;
use crate::context::OpContext;
use crate::metrics;
use crate::models::LogEntry;
use crate::store::{RelationalStore, StoreError};

pub use error::RepoError;
pub use memory::InMemoryRepository;
pub use query::{SearchParams, SearchQuery, Statement, DEFAULT_SEARCH_LIMIT, MAX_SEARCH_LIMIT};

struct CacheLayer {
    cache: Arc<dyn Cache>,
    prefix: String,
}

impl CacheLayer {
    fn key(&self, id: i64) -> String {
        format!("{}logentry:{}", self.prefix, id)
    }
}

pub struct LogEntryRepository {
    store: Arc<dyn RelationalStore>,
    cache: Option<CacheLayer>,
}

impl LogEntryRepository {
    /// Repository without caching
    pub fn new(store: Arc<dyn RelationalStore>) -> Self {
        Self { store, cache: None }
    }

    /// Enable caching; every key is namespaced with `prefix`.
    pub fn with_cache(mut self, cache: Arc<dyn Cache>, prefix: impl Into<String>) -> Self {
        self.cache = Some(CacheLayer {
            cache,
            prefix: prefix.into(),
        });
        self
    }

    pub fn cache_enabled(&self) -> bool {
        self.cache.is_some()
    }

    /// Cache key for `id`, or `None` when caching is disabled
    pub fn cache_key(&self, id: i64) -> Option<String> {
        self.cache.as_ref().map(|layer| layer.key(id))
    }

    /// Persist `entry`.
    ///
    /// `id <= 0` inserts and writes the generated id back onto `entry`;
    /// `id > 0` upserts the row with that id. The stored timestamp is
    /// truncated to microseconds so the cached copy equals the stored one.
    /// `entry` is only updated once the store accepted the write.
    pub async fn save(&self, ctx: &OpContext, entry: &mut LogEntry) -> Result<(), RepoError> {
        let dialect = self.store.dialect();
        let mut stored = entry.clone();
        stored.normalize_timestamp();

        if stored.id <= 0 {
            let stmt = query::insert(dialect, &stored.level, &stored.message, stored.timestamp);
            let row = self
                .store_call(ctx, "save: insert", self.store.query_row(&stmt.sql, &stmt.args))
                .await?;
            stored.id = row.id;
        } else {
            let stmt = query::upsert(
                dialect,
                stored.id,
                &stored.level,
                &stored.message,
                stored.timestamp,
            );
            let affected = self
                .store_call(ctx, "save: upsert", self.store.exec(&stmt.sql, &stmt.args))
                .await?;
            if affected == 0 {
                return Err(RepoError::NotFound { id: stored.id });
            }
        }

        debug!(id = stored.id, level = %stored.level, "Log entry saved");
        self.cache_write(ctx, &stored, Duration::ZERO).await;
        *entry = stored;
        Ok(())
    }

    /// Fetch one entry.
    ///
    /// With `use_cache`, a cache hit is returned without touching the store.
    /// Every store read refreshes the cache with `ttl` when caching is enabled.
    pub async fn get_by_id(
        &self,
        ctx: &OpContext,
        id: i64,
        use_cache: bool,
        ttl: Duration,
    ) -> Result<LogEntry, RepoError> {
        if use_cache {
            if let Some(entry) = self.cache_read(ctx, id).await? {
                return Ok(entry);
            }
        }

        let stmt = query::select_by_id(self.store.dialect(), id);
        let entry = match ctx.run(self.store.query_row(&stmt.sql, &stmt.args)).await {
            Ok(Ok(entry)) => entry,
            Ok(Err(StoreError::NoRows)) => return Err(RepoError::NotFound { id }),
            Ok(Err(e)) => return Err(self.store_failure("get_by_id", e)),
            Err(reason) => return Err(RepoError::interrupted("get_by_id", reason)),
        };

        self.cache_write(ctx, &entry, ttl).await;
        Ok(entry)
    }

    /// Every stored entry in the store's natural order. Never cached.
    pub async fn all(&self, ctx: &OpContext) -> Result<Vec<LogEntry>, RepoError> {
        let stmt = query::select_all();
        self.store_call(ctx, "all", self.store.query(&stmt.sql, &stmt.args))
            .await
    }

    /// Filtered search, newest first. No match is an empty vector. Never cached.
    pub async fn search(
        &self,
        ctx: &OpContext,
        params: &SearchParams,
    ) -> Result<Vec<LogEntry>, RepoError> {
        let stmt = SearchQuery::from_params(self.store.dialect(), params)
            .build(params.effective_limit(), params.effective_offset());
        debug!(sql = %stmt.sql, args = stmt.args.len(), "Searching log entries");

        self.store_call(ctx, "search", self.store.query(&stmt.sql, &stmt.args))
            .await
    }

    /// Close the store pool and the cache.
    pub async fn close(&self) {
        self.store.close().await;
        if let Some(layer) = &self.cache {
            layer.cache.close().await;
        }
    }

    async fn store_call<T, F>(&self, ctx: &OpContext, op: &'static str, fut: F) -> Result<T, RepoError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match ctx.run(fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(self.store_failure(op, e)),
            Err(reason) => Err(RepoError::interrupted(op, reason)),
        }
    }

    fn store_failure(&self, op: &'static str, source: StoreError) -> RepoError {
        metrics::record_store_error(op);
        warn!(op, error = %source, "Store operation failed");
        RepoError::store(op, source)
    }

    /// Cached entry for `id`. Cache failures count as a miss; only an
    /// interrupted context is reported.
    async fn cache_read(&self, ctx: &OpContext, id: i64) -> Result<Option<LogEntry>, RepoError> {
        let Some(layer) = &self.cache else {
            return Ok(None);
        };
        let key = layer.key(id);

        let raw = match ctx.run(layer.cache.get(&key)).await {
            Ok(Ok(Some(raw))) => raw,
            Ok(Ok(None)) => {
                metrics::record_cache_lookup("miss");
                debug!(key = %key, "Cache miss");
                return Ok(None);
            }
            Ok(Err(e)) => {
                metrics::record_cache_lookup("error");
                warn!(key = %key, error = %e, "Cache read failed, falling back to store");
                return Ok(None);
            }
            Err(reason) => return Err(RepoError::interrupted("get_by_id: cache read", reason)),
        };

        match serde_json::from_str::<LogEntry>(&raw) {
            Ok(entry) => {
                metrics::record_cache_lookup("hit");
                debug!(key = %key, "Cache hit");
                Ok(Some(entry))
            }
            Err(e) => {
                metrics::record_cache_lookup("error");
                warn!(key = %key, error = %e, "Cached value is not a log entry, ignoring");
                Ok(None)
            }
        }
    }

    async fn cache_write(&self, ctx: &OpContext, entry: &LogEntry, ttl: Duration) {
        let Some(layer) = &self.cache else {
            return;
        };
        let key = layer.key(entry.id);

        let value = match serde_json::to_string(entry) {
            Ok(value) => value,
            Err(e) => {
                metrics::record_cache_write("error");
                warn!(key = %key, error = %e, "Failed to encode log entry for cache");
                return;
            }
        };

        match ctx.run(layer.cache.set(&key, &value, ttl)).await {
            Ok(Ok(())) => metrics::record_cache_write("ok"),
            Ok(Err(e)) => {
                metrics::record_cache_write("error");
                warn!(key = %key, error = %e, "Cache write failed");
            }
            Err(reason) => {
                metrics::record_cache_write("error");
                debug!(key = %key, ?reason, "Cache write skipped");
            }
        }
    }
}
