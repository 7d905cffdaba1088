//! Prometheus metrics

use anyhow::Result;
use metrics_exporter_prometheus::PrometheusBuilder;

/// Setup Prometheus metrics exporter
/// Returns a handle that can be used to retrieve metrics
pub fn setup_metrics() -> Result<metrics_exporter_prometheus::PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install Prometheus exporter: {}", e))?;

    tracing::info!("Prometheus metrics exporter installed");

    Ok(handle)
}

/// Record a model load attempt (`success`, `error` or `corrupt`)
pub fn record_model_load(outcome: &'static str) {
    metrics::counter!("cluster_estimator_model_loads_total",
        "outcome" => outcome
    )
    .increment(1);
}

/// Record predicted rows by mode (`model` or `demo`)
pub fn record_prediction(mode: &'static str, rows: usize) {
    metrics::counter!("cluster_estimator_predictions_total",
        "mode" => mode
    )
    .increment(rows as u64);
}

/// Record a failed store operation
pub fn record_store_error(operation: &'static str) {
    metrics::counter!("cluster_estimator_store_errors_total",
        "operation" => operation
    )
    .increment(1);
}

/// Record a successful artifact upload
pub fn record_upload() {
    metrics::counter!("cluster_estimator_uploads_total").increment(1);
}

/// Mark the estimator for `location` (`bucket/key`) as serving demo predictions
///
/// Demo mode is never left, so the series only ever goes to 1.
pub fn record_demo_mode(location: String) {
    metrics::gauge!("cluster_estimator_demo_mode",
        "location" => location
    )
    .set(1.0);
}
