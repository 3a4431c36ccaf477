//! Request metrics
//!
//! Counters emitted through the `metrics` facade:
//!
//! - `gazetteer_requests_total` (counter): labels `method`, `status`
//! - `gazetteer_request_retries_total` (counter): label `method`
//! - `gazetteer_transport_errors_total` (counter): label `method`
//!
//! The embedding application decides whether to install a recorder;
//! without one every call is a no-op.

/// Record a completed attempt with its terminal HTTP status.
pub fn record_request(method: &str, status: u16) {
    metrics::counter!(
        "gazetteer_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record a retry dispatched with a refreshed token.
pub fn record_retry(method: &str) {
    metrics::counter!("gazetteer_request_retries_total", "method" => method.to_string())
        .increment(1);
}

/// Record a transport-level failure (no HTTP status to report).
pub fn record_transport_error(method: &str) {
    metrics::counter!("gazetteer_transport_errors_total", "method" => method.to_string())
        .increment(1);
}
