//! Relational store port
//!
//! The repository hands the store finished SQL text plus positional
//! arguments; the store binds the arguments and scans result rows into
//! [`LogEntry`] values in the fixed column order `id, level, message,
//! timestamp`.

pub mod postgres;
pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

use crate::models::LogEntry;

pub use postgres::PostgresStore;
pub use sqlite::SqliteStore;

/// Table holding log entries in every backend
pub const TABLE: &str = "log_entries";

/// SQL flavor spoken by a store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Postgres,
    Sqlite,
}

impl Dialect {
    /// Placeholder for the argument at 1-based `position`
    pub fn placeholder(self, position: usize) -> String {
        match self {
            Dialect::Postgres => format!("${}", position),
            Dialect::Sqlite => "?".to_string(),
        }
    }

    /// Operator for a case-insensitive pattern match
    ///
    /// SQLite's `LIKE` already ignores ASCII case.
    pub fn case_insensitive_like(self) -> &'static str {
        match self {
            Dialect::Postgres => "ILIKE",
            Dialect::Sqlite => "LIKE",
        }
    }
}

/// Bound query argument
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Int(i64),
    Text(String),
    Timestamp(DateTime<Utc>),
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Int(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(v: DateTime<Utc>) -> Self {
        SqlValue::Timestamp(v)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// `query_row` matched nothing
    #[error("no rows in result set")]
    NoRows,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("stored timestamp {0} is out of range")]
    InvalidTimestamp(i64),
}

#[async_trait]
pub trait RelationalStore: Send + Sync {
    fn dialect(&self) -> Dialect;

    /// Run a query expected to produce one row. Zero rows is [`StoreError::NoRows`].
    async fn query_row(&self, sql: &str, args: &[SqlValue]) -> Result<LogEntry, StoreError>;

    async fn query(&self, sql: &str, args: &[SqlValue]) -> Result<Vec<LogEntry>, StoreError>;

    /// Run a statement and return the number of affected rows.
    async fn exec(&self, sql: &str, args: &[SqlValue]) -> Result<u64, StoreError>;

    async fn close(&self);
}

/// Pool settings shared by the SQL adapters
#[derive(Debug, Clone)]
pub struct PoolOptions {
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            max_connections: 5,
            acquire_timeout: Duration::from_secs(5),
        }
    }
}

/// Open the store named by `url` (`postgres://…` or `sqlite:…`) and make
/// sure the log table exists.
pub async fn connect(url: &str, options: &PoolOptions) -> anyhow::Result<Arc<dyn RelationalStore>> {
    if url.starts_with("postgres://") || url.starts_with("postgresql://") {
        let store = PostgresStore::connect(url, options).await?;
        store.ensure_schema().await?;
        Ok(Arc::new(store))
    } else if url.starts_with("sqlite:") {
        let store = SqliteStore::connect(url, options).await?;
        store.ensure_schema().await?;
        Ok(Arc::new(store))
    } else {
        anyhow::bail!("Unsupported database URL scheme: {}", redact_url(url))
    }
}

/// Drop credentials from a connection URL before it reaches a log line.
pub fn redact_url(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(mut parsed) if parsed.password().is_some() => {
            let _ = parsed.set_password(Some("***"));
            parsed.to_string()
        }
        Ok(parsed) => parsed.to_string(),
        Err(_) => raw.split('@').last().unwrap_or(raw).to_string(),
    }
}
