//! PostgreSQL store

use anyhow::Context;
use async_trait::async_trait;
use sqlx::postgres::{PgArguments, PgPool, PgPoolOptions, PgRow, Postgres};
use sqlx::query::Query;
use sqlx::Row;

use super::{Dialect, PoolOptions, RelationalStore, SqlValue, StoreError, TABLE};
use crate::models::LogEntry;

pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create the pool and check connectivity with one round trip.
    pub async fn connect(database_url: &str, options: &PoolOptions) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(options.max_connections)
            .acquire_timeout(options.acquire_timeout)
            .connect(database_url)
            .await
            .context("Failed to create postgres pool")?;

        sqlx::query("SELECT 1")
            .execute(&pool)
            .await
            .context("Failed to ping postgres")?;

        Ok(Self { pool })
    }

    pub async fn ensure_schema(&self) -> anyhow::Result<()> {
        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS {TABLE} (
                id BIGINT GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY,
                level TEXT NOT NULL,
                message TEXT NOT NULL,
                timestamp TIMESTAMPTZ NOT NULL
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

        tracing::debug!("PostgreSQL schema ready");
        Ok(())
    }
}

fn bind<'q>(sql: &'q str, args: &'q [SqlValue]) -> Query<'q, Postgres, PgArguments> {
    let mut query = sqlx::query(sql);
    for arg in args {
        query = match arg {
            SqlValue::Int(v) => query.bind(*v),
            SqlValue::Text(v) => query.bind(v.as_str()),
            SqlValue::Timestamp(v) => query.bind(*v),
        };
    }
    query
}

fn scan(row: &PgRow) -> Result<LogEntry, StoreError> {
    Ok(LogEntry {
        id: row.try_get(0)?,
        level: row.try_get(1)?,
        message: row.try_get(2)?,
        timestamp: row.try_get(3)?,
    })
}

#[async_trait]
impl RelationalStore for PostgresStore {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
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
