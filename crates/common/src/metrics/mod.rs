//! Metrics and observability utilities
//!
//! Provides Prometheus metrics with SLO-aligned histograms
//! and standardized naming conventions.

use metrics::{
    counter, describe_counter, describe_histogram, histogram, Unit,
};
use std::time::Instant;

/// Metrics prefix for all Peerview metrics
pub const METRICS_PREFIX: &str = "peerview";

/// SLO-aligned histogram buckets for request latency (in seconds)
/// Targets: P50 < 50ms, P99 < 150ms
pub const LATENCY_BUCKETS: &[f64] = &[
    0.001,  // 1ms
    0.005,  // 5ms
    0.010,  // 10ms
    0.025,  // 25ms
    0.050,  // 50ms - P50 target
    0.075,  // 75ms
    0.100,  // 100ms
    0.150,  // 150ms - P99 target
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.500,  // 2.5s
    5.000,  // 5s
    10.00,  // 10s
];

/// Buckets for storage upload round-trips (typically slower)
pub const UPLOAD_BUCKETS: &[f64] = &[
    0.050,  // 50ms
    0.100,  // 100ms
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.000,  // 2s
    5.000,  // 5s
    10.00,  // 10s
    30.00,  // 30s
];

/// Register all metric descriptions
pub fn register_metrics() {
    // Request metrics
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    // Submission lifecycle metrics
    describe_counter!(
        format!("{}_submissions_total", METRICS_PREFIX),
        Unit::Count,
        "Total journal submissions accepted"
    );

    describe_counter!(
        format!("{}_status_transitions_total", METRICS_PREFIX),
        Unit::Count,
        "Total submission status transitions recorded"
    );

    // Notification metrics
    describe_counter!(
        format!("{}_notifications_total", METRICS_PREFIX),
        Unit::Count,
        "Total reviewer invitation dispatch attempts"
    );

    // Storage collaborator metrics
    describe_counter!(
        format!("{}_storage_uploads_total", METRICS_PREFIX),
        Unit::Count,
        "Total file uploads to the storage provider"
    );

    describe_histogram!(
        format!("{}_storage_upload_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Storage upload round-trip latency in seconds"
    );

    describe_counter!(
        format!("{}_storage_deletes_total", METRICS_PREFIX),
        Unit::Count,
        "Total file deletions at the storage provider"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Helper to record an accepted submission
pub fn record_submission(file_type: &str) {
    counter!(
        format!("{}_submissions_total", METRICS_PREFIX),
        "file_type" => file_type.to_string()
    )
    .increment(1);
}

/// Helper to record a status transition
pub fn record_status_transition(status: &str) {
    counter!(
        format!("{}_status_transitions_total", METRICS_PREFIX),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Helper to record a reviewer notification attempt
pub fn record_notification(success: bool) {
    let outcome = if success { "sent" } else { "failed" };

    counter!(
        format!("{}_notifications_total", METRICS_PREFIX),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Helper to record a storage upload round-trip
pub fn record_upload(duration_secs: f64, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_storage_uploads_total", METRICS_PREFIX),
        "status" => status.to_string()
    )
    .increment(1);

    if success {
        histogram!(format!("{}_storage_upload_duration_seconds", METRICS_PREFIX))
            .record(duration_secs);
    }
}

/// Helper to record a storage deletion attempt
pub fn record_storage_delete(success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_storage_deletes_total", METRICS_PREFIX),
        "status" => status.to_string()
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latency_buckets() {
        // Verify buckets are sorted and contain SLO targets
        let mut prev = 0.0;
        for &bucket in LATENCY_BUCKETS {
            assert!(bucket > prev);
            prev = bucket;
        }

        // P50 target (50ms) should be in buckets
        assert!(LATENCY_BUCKETS.contains(&0.050));
        // P99 target (150ms) should be in buckets
        assert!(LATENCY_BUCKETS.contains(&0.150));
    }

    #[test]
    fn test_upload_buckets_cover_the_timeout_window() {
        let mut prev = 0.0;
        for &bucket in UPLOAD_BUCKETS {
            assert!(bucket > prev);
            prev = bucket;
        }
        assert_eq!(*UPLOAD_BUCKETS.last().unwrap(), 30.0);
    }

    #[test]
    fn test_request_metrics() {
        let metrics = RequestMetrics::start("GET", "/journals");
        std::thread::sleep(std::time::Duration::from_millis(10));
        metrics.finish(200);
        // Just verify it runs without panic
    }

    #[test]
    fn test_domain_recorders_run() {
        record_submission("pdf");
        record_status_transition("approved");
        record_notification(true);
        record_notification(false);
        record_upload(0.25, true);
        record_upload(0.25, false);
        record_storage_delete(true);
    }
}
