//! Prometheus metrics for dpm-ledger-service.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, HistogramVec, TextEncoder,
};

/// Ledger API requests by endpoint and status code.
pub static LEDGER_REQUESTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "dpm_ledger_requests_total",
        "Total number of ledger API requests",
        &["endpoint", "status"]
    )
    .expect("Failed to register dpm_ledger_requests_total")
});

/// Ledger API request duration by endpoint.
pub static LEDGER_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "dpm_ledger_request_duration_seconds",
        "Ledger API request duration in seconds",
        &["endpoint"],
        vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .expect("Failed to register dpm_ledger_request_duration")
});

/// Partition open attempts by kind and outcome (ok, missing, error).
pub static PARTITION_OPENS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "dpm_ledger_partition_opens_total",
        "Ledger partition open attempts",
        &["kind", "outcome"]
    )
    .expect("Failed to register dpm_ledger_partition_opens_total")
});

/// Events read out of legacy tables, by event type.
pub static EVENTS_FETCHED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "dpm_ledger_events_fetched_total",
        "Ledger events fetched from legacy partitions",
        &["event_type"]
    )
    .expect("Failed to register dpm_ledger_events_fetched_total")
});

/// Legacy table query duration by event type.
pub static LEDGER_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "dpm_ledger_partition_query_duration_seconds",
        "Legacy partition query duration in seconds",
        &["event_type"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]
    )
    .expect("Failed to register dpm_ledger_partition_query_duration")
});

/// Audit store query duration by operation.
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "dpm_ledger_db_query_duration_seconds",
        "Audit database query duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .expect("Failed to register dpm_ledger_db_query_duration")
});

/// Initialize all metrics (forces lazy initialization).
pub fn init_metrics() {
    Lazy::force(&LEDGER_REQUESTS_TOTAL);
    Lazy::force(&LEDGER_REQUEST_DURATION);
    Lazy::force(&PARTITION_OPENS_TOTAL);
    Lazy::force(&EVENTS_FETCHED_TOTAL);
    Lazy::force(&LEDGER_QUERY_DURATION);
    Lazy::force(&DB_QUERY_DURATION);
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder
        .encode_to_string(&metric_families)
        .unwrap_or_default()
}

/// Record one ledger API request.
pub fn record_request(endpoint: &str, status: u16, duration_secs: f64) {
    LEDGER_REQUESTS_TOTAL
        .with_label_values(&[endpoint, &status.to_string()])
        .inc();
    LEDGER_REQUEST_DURATION
        .with_label_values(&[endpoint])
        .observe(duration_secs);
}
