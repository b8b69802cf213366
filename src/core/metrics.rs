//! Prometheus metrics for monitoring the chat relay.
//!
//! This module provides a centralized metrics registry for tracking requests,
//! latency, streaming activity and upstream failures.

use prometheus::{
    register_gauge_vec, register_histogram_vec, register_int_counter, register_int_counter_vec,
    register_int_gauge, GaugeVec, HistogramVec, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;

/// Container for all application metrics.
pub struct Metrics {
    /// Total number of requests by method, endpoint, model and status
    pub request_count: IntCounterVec,

    /// Request duration histogram in seconds (time to first byte for streams)
    pub request_duration: HistogramVec,

    /// Number of currently active requests by endpoint
    pub active_requests: GaugeVec,

    /// Number of relay streams currently open
    pub active_streams: IntGauge,

    /// Events forwarded to clients by event type (delta, done, error)
    pub stream_events: IntCounterVec,

    /// Upstream failures by operation and error kind
    pub upstream_errors: IntCounterVec,

    /// Upstream call latency in seconds by operation
    pub upstream_latency: HistogramVec,

    /// Streams abandoned because the client went away
    pub client_disconnects_total: IntCounter,
}

static METRICS: OnceLock<Metrics> = OnceLock::new();

/// Initialize the metrics registry.
///
/// This should be called once at application startup. Subsequent calls will
/// return the same instance.
pub fn init_metrics() -> &'static Metrics {
    METRICS.get_or_init(|| {
        let request_count = register_int_counter_vec!(
            "translate_backend_requests_total",
            "Total number of requests",
            &["method", "endpoint", "model", "status_code"]
        )
        .expect("Failed to register request_count metric");

        let request_duration = register_histogram_vec!(
            "translate_backend_request_duration_seconds",
            "Request duration in seconds",
            &["method", "endpoint", "model"],
            vec![0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0]
        )
        .expect("Failed to register request_duration metric");

        let active_requests = register_gauge_vec!(
            "translate_backend_active_requests",
            "Number of active requests",
            &["endpoint"]
        )
        .expect("Failed to register active_requests metric");

        let active_streams = register_int_gauge!(
            "translate_backend_active_streams",
            "Number of relay streams currently open"
        )
        .expect("Failed to register active_streams metric");

        let stream_events = register_int_counter_vec!(
            "translate_backend_stream_events_total",
            "Events forwarded to clients by type",
            &["event_type"]
        )
        .expect("Failed to register stream_events metric");

        let upstream_errors = register_int_counter_vec!(
            "translate_backend_upstream_errors_total",
            "Upstream failures by operation and kind",
            &["operation", "kind"]
        )
        .expect("Failed to register upstream_errors metric");

        let upstream_latency = register_histogram_vec!(
            "translate_backend_upstream_latency_seconds",
            "Upstream call latency in seconds",
            &["operation"],
            vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]
        )
        .expect("Failed to register upstream_latency metric");

        let client_disconnects_total = register_int_counter!(
            "translate_backend_client_disconnects_total",
            "Streams abandoned because the client disconnected"
        )
        .expect("Failed to register client_disconnects metric");

        Metrics {
            request_count,
            request_duration,
            active_requests,
            active_streams,
            stream_events,
            upstream_errors,
            upstream_latency,
            client_disconnects_total,
        }
    })
}

/// Get the global metrics instance, initializing it on first use.
pub fn get_metrics() -> &'static Metrics {
    init_metrics()
}
