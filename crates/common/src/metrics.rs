use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};

lazy_static! {
    // Ingestion metrics
    pub static ref INGEST_COUNTER: CounterVec = register_counter_vec!(
        "orders_ingested_total",
        "Total number of order messages handled, by outcome",
        &["outcome"]
    )
    .expect("metric cannot be created");

    pub static ref INGEST_DURATION: HistogramVec = register_histogram_vec!(
        "orders_ingest_duration_seconds",
        "Order message handling duration in seconds",
        &["outcome"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
    )
    .expect("metric cannot be created");

    pub static ref DEAD_LETTER_COUNTER: CounterVec = register_counter_vec!(
        "orders_dead_lettered_total",
        "Total number of order messages routed to the dead-letter topic",
        &["reason", "status"]
    )
    .expect("metric cannot be created");

    // Cache metrics
    pub static ref CACHE_REQUESTS: CounterVec = register_counter_vec!(
        "orders_cache_requests_total",
        "Total number of order cache lookups",
        &["status"]
    )
    .expect("metric cannot be created");

    // Store metrics
    pub static ref STORE_OPERATIONS: CounterVec = register_counter_vec!(
        "orders_store_operations_total",
        "Total number of order store operations",
        &["operation", "status"]
    )
    .expect("metric cannot be created");

    pub static ref STORE_DURATION: HistogramVec = register_histogram_vec!(
        "orders_store_duration_seconds",
        "Order store operation duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 3.0]
    )
    .expect("metric cannot be created");

    // Query metrics
    pub static ref QUERY_COUNTER: CounterVec = register_counter_vec!(
        "orders_queries_total",
        "Total number of order lookups served over HTTP",
        &["status"]
    )
    .expect("metric cannot be created");
}

/// Get all metrics in Prometheus text format
pub fn gather_metrics() -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Record the outcome of one handled message
pub fn record_ingest(outcome: &str, duration_secs: f64) {
    INGEST_COUNTER.with_label_values(&[outcome]).inc();
    INGEST_DURATION
        .with_label_values(&[outcome])
        .observe(duration_secs);
}

/// Record a dead-letter routing attempt
pub fn record_dead_letter(reason: &str, routed: bool) {
    let status = if routed { "routed" } else { "failed" };
    DEAD_LETTER_COUNTER
        .with_label_values(&[reason, status])
        .inc();
}

/// Helper function to record cache hit/miss
pub fn record_cache_request(hit: bool) {
    let status = if hit { "hit" } else { "miss" };
    CACHE_REQUESTS.with_label_values(&[status]).inc();
}

/// Helper function to record order store operation
pub fn record_store_operation(operation: &str, success: bool, duration_secs: f64) {
    let status = if success { "success" } else { "error" };
    STORE_OPERATIONS
        .with_label_values(&[operation, status])
        .inc();
    STORE_DURATION
        .with_label_values(&[operation])
        .observe(duration_secs);
}

/// Record an HTTP order lookup by response class
pub fn record_query(status: &str) {
    QUERY_COUNTER.with_label_values(&[status]).inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_ingest() {
        record_ingest("stored", 0.01);
        let metrics = gather_metrics().unwrap();
        assert!(metrics.contains("orders_ingested_total"));
        assert!(metrics.contains("orders_ingest_duration_seconds"));
    }

    #[test]
    fn test_record_dead_letter() {
        record_dead_letter("decode", false);
        let metrics = gather_metrics().unwrap();
        assert!(metrics.contains("orders_dead_lettered_total"));
        assert!(metrics.contains("status=\"failed\""));
    }

    #[test]
    fn test_record_cache_and_store() {
        record_cache_request(true);
        record_store_operation("insert", true, 0.002);
        let metrics = gather_metrics().unwrap();
        assert!(metrics.contains("orders_cache_requests_total"));
        assert!(metrics.contains("orders_store_operations_total"));
    }
}
