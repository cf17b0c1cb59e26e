use metrics::{counter, describe_counter, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder
///
/// Fails if a recorder is already installed for this process.
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    init_metric_descriptions();
    Ok(handle)
}

fn init_metric_descriptions() {
    describe_counter!(
        "logkeep_cache_requests_total",
        "Cache lookups by result (hit, miss, error)"
    );
    describe_counter!(
        "logkeep_cache_writes_total",
        "Cache writes by result (ok, error)"
    );
    describe_counter!(
        "logkeep_store_errors_total",
        "Failed store operations"
    );

    gauge!("logkeep_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);
}

pub fn record_cache_lookup(result: &'static str) {
    counter!("logkeep_cache_requests_total", "result" => result).increment(1);
}

pub fn record_cache_write(result: &'static str) {
    counter!("logkeep_cache_writes_total", "result" => result).increment(1);
}

pub fn record_store_error(op: &'static str) {
    counter!("logkeep_store_errors_total", "op" => op).increment(1);
}
