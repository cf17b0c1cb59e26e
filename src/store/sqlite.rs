//! SQLite store
//!
//! Timestamps are kept as INTEGER microseconds since the Unix epoch, so
//! range filters and ordering compare numbers instead of text.

use anyhow::Context;
use async_trait::async_trait;
use chrono::DateTime;
use sqlx::query::Query;
use sqlx::sqlite::{
    Sqlite, SqliteArguments, SqliteConnectOptions, SqliteJournalMode, SqlitePool,
    SqlitePoolOptions, SqliteRow,
};
use sqlx::Row;
use std::str::FromStr;
use std::time::Duration;

use super::{Dialect, PoolOptions, RelationalStore, SqlValue, StoreError, TABLE};
use crate::models::LogEntry;

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open a file-backed database, creating the file and its folder if absent.
    pub async fn connect(database_url: &str, options: &PoolOptions) -> anyhow::Result<Self> {
        let connect_options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(30));

        if let Some(parent) = connect_options.get_filename().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(options.max_connections)
            .acquire_timeout(options.acquire_timeout)
            .connect_with(connect_options)
            .await
            .context("Failed to connect to SQLite database")?;

        Ok(Self { pool })
    }

    /// Private in-memory database with the log table already created
    ///
    /// Every SQLite connection to `:memory:` is its own database, so the
    /// pool holds exactly one connection and never recycles it.
    pub async fn in_memory() -> anyhow::Result<Self> {
        let connect_options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(connect_options)
            .await
            .context("Failed to open in-memory SQLite database")?;

        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    pub async fn ensure_schema(&self) -> anyhow::Result<()> {
        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS {TABLE} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                level TEXT NOT NULL,
                message TEXT NOT NULL,
                timestamp INTEGER NOT NULL
            )"
        ))
        .execute(&self.pool)
        .await
        .context("Failed to create log_entries table")?;

        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS idx_{TABLE}_timestamp ON {TABLE} (timestamp DESC)"
        ))
        .execute(&self.pool)
        .await?;

        tracing::debug!("SQLite schema ready");
        Ok(())
    }
}

fn bind<'q>(sql: &'q str, args: &'q [SqlValue]) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    let mut query = sqlx::query(sql);
    for arg in args {
        query = match arg {
            SqlValue::Int(v) => query.bind(*v),
            SqlValue::Text(v) => query.bind(v.as_str()),
            SqlValue::Timestamp(v) => query.bind(v.timestamp_micros()),
        };
    }
    query
}

fn scan(row: &SqliteRow) -> Result<LogEntry, StoreError> {
    let micros: i64 = row.try_get(3)?;
    let timestamp =
        DateTime::from_timestamp_micros(micros).ok_or(StoreError::InvalidTimestamp(micros))?;

    Ok(LogEntry {
        id: row.try_get(0)?,
        level: row.try_get(1)?,
        message: row.try_get(2)?,
        timestamp,
    })
}

#[async_trait]
impl RelationalStore for SqliteStore {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    async fn query_row(&self, sql: &str, args: &[SqlValue]) -> Result<LogEntry, StoreError> {
        let row = bind(sql, args).fetch_optional(&self.pool).await?;
        match row {
            Some(row) => scan(&row),
            None => Err(StoreError::NoRows),
        }
    }

    async fn query(&self, sql: &str, args: &[SqlValue]) -> Result<Vec<LogEntry>, StoreError> {
        let rows = bind(sql, args).fetch_all(&self.pool).await?;
        rows.iter().map(scan).collect()
    }

    async fn exec(&self, sql: &str, args: &[SqlValue]) -> Result<u64, StoreError> {
        let result = bind(sql, args).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
