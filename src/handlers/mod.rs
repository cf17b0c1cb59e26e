pub mod health;
pub mod logs;

use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;

use crate::context::OpContext;
use crate::repository::LogEntryRepository;

/// Shared state for all HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<LogEntryRepository>,
    /// TTL used when a read refreshes the cache
    pub read_ttl: Duration,
    pub request_timeout: Duration,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(repo: Arc<LogEntryRepository>) -> Self {
        Self {
            repo,
            read_ttl: Duration::from_secs(300),
            request_timeout: Duration::from_secs(5),
            metrics: None,
        }
    }

    /// Context for one request's repository call
    pub fn op_context(&self) -> OpContext {
        OpContext::with_timeout(self.request_timeout)
    }
}
