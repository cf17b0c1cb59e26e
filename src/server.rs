use anyhow::Result;
use axum::{
    extract::DefaultBodyLimit,
    routing::get,
    Router,
};
use std::{net::SocketAddr, sync::Arc};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::{
    cache,
    config::Config,
    handlers::{self, AppState},
    metrics,
    repository::LogEntryRepository,
    signals::shutdown_signal,
    store,
};

/// Start the log service
///
/// This function:
/// 1. Initializes metrics
/// 2. Connects the store and (optionally) the cache
/// 3. Binds to the configured address
/// 4. Serves requests until SIGINT/SIGTERM, then closes the repository
pub async fn start_server(config: Config) -> Result<()> {
    info!("Initializing Prometheus metrics...");
    let metrics_handle = match metrics::init_metrics() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!(error = %e, "Metrics recorder unavailable, /metrics disabled");
            None
        }
    };

    let repo = Arc::new(connect_repository(&config, config.cache.enabled).await?);

    let state = AppState {
        repo: repo.clone(),
        read_ttl: config.cache.read_ttl(),
        request_timeout: config.server.request_timeout(),
        metrics: metrics_handle,
    };
    let app = create_router(state);

    let addr = SocketAddr::from((
        config.server.host.parse::<std::net::IpAddr>()?,
        config.server.port,
    ));

    info!("Starting logkeep on {}", addr);
    info!(
        "Configuration: store {}, cache {}",
        store::redact_url(&config.database.connection_url()?),
        if repo.cache_enabled() { "enabled" } else { "disabled" }
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            shutdown_signal().await;
            info!("Shutdown signal received, draining connections...");
        })
        .await?;

    repo.close().await;
    info!("Server stopped gracefully");

    Ok(())
}

/// Connect the relational store, plus the cache when `with_cache` is set.
///
/// A cache that cannot be reached is logged and skipped; the repository
/// then serves everything from the store.
pub async fn connect_repository(config: &Config, with_cache: bool) -> Result<LogEntryRepository> {
    let url = config.database.connection_url()?;
    let store = store::connect(&url, &config.database.pool_options()).await?;
    let repo = LogEntryRepository::new(store);

    if !with_cache {
        return Ok(repo);
    }

    match cache::connect(&config.cache).await {
        Ok(cache) => {
            info!(backend = ?config.cache.backend, "Cache connected");
            Ok(repo.with_cache(cache, config.cache.key_prefix.clone()))
        }
        Err(e) => {
            warn!(error = %e, "Cache unavailable, running without cache");
            Ok(repo)
        }
    }
}

/// Create the Axum router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/logs",
            get(handlers::logs::list_logs).post(handlers::logs::create_log),
        )
        .route("/logs/search", get(handlers::logs::search_logs))
        .route("/logs/:id", get(handlers::logs::get_log))
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .route("/metrics", get(handlers::health::metrics))
        .with_state(state)
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(TraceLayer::new_for_http())
}
