use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::store::PoolOptions;

/// Environment variable prefix, e.g. `LOGKEEP_DATABASE__HOST`
pub const ENV_PREFIX: &str = "LOGKEEP";

/// One day
pub const MAX_REQUEST_TIMEOUT_SECONDS: u64 = 86_400;
/// One year
pub const MAX_READ_TTL_SECONDS: u64 = 31_536_000;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: String,
    /// Upper bound for the repository call behind each request
    pub request_timeout_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            log_level: "info".to_string(),
            log_format: "text".to_string(),
            request_timeout_seconds: 5,
        }
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

/// Relational store settings
///
/// `url` wins when set (`postgres://…` or `sqlite:…`); otherwise a
/// PostgreSQL URL is assembled from the individual fields.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
    pub ssl_mode: String,
    pub max_connections: u32,
    pub acquire_timeout_seconds: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: "127.0.0.1".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: "password".to_string(),
            name: "postgres".to_string(),
            ssl_mode: "disable".to_string(),
            max_connections: 5,
            acquire_timeout_seconds: 5,
        }
    }
}

impl DatabaseConfig {
    pub fn connection_url(&self) -> anyhow::Result<String> {
        if let Some(url) = self.url.as_deref().filter(|u| !u.is_empty()) {
            return Ok(url.to_string());
        }

        let mut url = url::Url::parse(&format!("postgres://{}:{}", self.host, self.port))?;
        url.set_username(&self.user)
            .map_err(|_| anyhow::anyhow!("Invalid database user"))?;
        url.set_password(Some(&self.password))
            .map_err(|_| anyhow::anyhow!("Invalid database password"))?;
        url.set_path(&self.name);
        url.query_pairs_mut().append_pair("sslmode", &self.ssl_mode);
        Ok(url.to_string())
    }

    pub fn pool_options(&self) -> PoolOptions {
        PoolOptions {
            max_connections: self.max_connections,
            acquire_timeout: Duration::from_secs(self.acquire_timeout_seconds),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// Valkey or Redis server
    Valkey,
    /// Process-local map, lost on restart
    Memory,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub backend: CacheBackend,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub db: u8,
    pub key_prefix: String,
    /// TTL applied when a read refreshes the cache
    pub read_ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: CacheBackend::Valkey,
            host: "localhost".to_string(),
            port: 6379,
            user: String::new(),
            password: String::new(),
            db: 0,
            key_prefix: "app:".to_string(),
            read_ttl_seconds: 300,
        }
    }
}

impl CacheConfig {
    pub fn connection_url(&self) -> anyhow::Result<String> {
        let mut url = url::Url::parse(&format!("redis://{}:{}", self.host, self.port))?;
        if !self.user.is_empty() {
            url.set_username(&self.user)
                .map_err(|_| anyhow::anyhow!("Invalid cache user"))?;
        }
        if !self.password.is_empty() {
            url.set_password(Some(&self.password))
                .map_err(|_| anyhow::anyhow!("Invalid cache password"))?;
        }
        url.set_path(&self.db.to_string());
        Ok(url.to_string())
    }

    pub fn read_ttl(&self) -> Duration {
        Duration::from_secs(self.read_ttl_seconds)
    }
}

/// Load configuration from `path` (optional) and `LOGKEEP_*` environment variables
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    let config = config::Config::builder()
        .add_source(config::File::from(path).required(false))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let cfg: Config = config.try_deserialize()?;
    validate_config(&cfg)?;

    Ok(cfg)
}

pub fn validate_config(cfg: &Config) -> anyhow::Result<()> {
    if cfg.server.port == 0 {
        anyhow::bail!("server.port must be between 1 and 65535");
    }

    if cfg.server.log_level.trim().is_empty() {
        anyhow::bail!("server.log_level cannot be empty");
    }

    match cfg.server.log_format.as_str() {
        "text" | "json" => {}
        other => anyhow::bail!("server.log_format must be \"text\" or \"json\", got {:?}", other),
    }

    if cfg.server.request_timeout_seconds == 0
        || cfg.server.request_timeout_seconds > MAX_REQUEST_TIMEOUT_SECONDS
    {
        anyhow::bail!(
            "server.request_timeout_seconds must be between 1 and {}, got {}",
            MAX_REQUEST_TIMEOUT_SECONDS,
            cfg.server.request_timeout_seconds
        );
    }

    if cfg.database.max_connections == 0 {
        anyhow::bail!("database.max_connections must be greater than 0");
    }

    if cfg.database.url.as_deref().map_or(true, str::is_empty) && cfg.database.port == 0 {
        anyhow::bail!("database.port must be between 1 and 65535");
    }

    if cfg.cache.enabled && cfg.cache.read_ttl_seconds > MAX_READ_TTL_SECONDS {
        anyhow::bail!(
            "cache.read_ttl_seconds must be at most {}, got {}",
            MAX_READ_TTL_SECONDS,
            cfg.cache.read_ttl_seconds
        );
    }

    if cfg.cache.enabled && cfg.cache.backend == CacheBackend::Valkey {
        if cfg.cache.port == 0 {
            anyhow::bail!("cache.port must be between 1 and 65535");
        }
        if cfg.cache.db > 15 {
            anyhow::bail!(
                "cache.db must be between 0 and 15 (standard Redis range), got {}",
                cfg.cache.db
            );
        }
    }

    Ok(())
}
