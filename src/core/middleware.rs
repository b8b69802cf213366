//! HTTP middleware for request tracking and metrics.

use crate::core::metrics::get_metrics;
use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

/// Paths that relay to the upstream and get model-aware logging.
const RELAY_PATHS: &[&str] = &["/api/v1/openai/chat", "/api/v1/openai/models"];

/// Extension type for storing model name in response
#[derive(Clone, Debug)]
pub struct ModelName(pub String);

/// Middleware for tracking request metrics.
pub struct MetricsMiddleware;

impl MetricsMiddleware {
    /// Track metrics for incoming requests.
    ///
    /// Increments the active request gauge, measures duration and records the
    /// request count by status code. Handlers that know the model attach a
    /// [`ModelName`] extension to the response.
    pub async fn track_metrics(request: Request, next: Next) -> Response {
        let endpoint = request.uri().path().to_string();
        let method = request.method().to_string();

        // Skip metrics endpoint itself to avoid recursion
        if endpoint == "/metrics" {
            return next.run(request).await;
        }

        let metrics = get_metrics();
        metrics
            .active_requests
            .with_label_values(&[&endpoint])
            .inc();

        let start = Instant::now();
        let response = next.run(request).await;
        let duration = start.elapsed().as_secs_f64();
        let status_code = response.status().as_u16().to_string();

        let model = response
            .extensions()
            .get::<ModelName>()
            .map(|m| m.0.as_str())
            .unwrap_or("unknown");

        metrics
            .request_count
            .with_label_values(&[&method, &endpoint, model, &status_code])
            .inc();
        metrics
            .request_duration
            .with_label_values(&[&method, &endpoint, model])
            .observe(duration);

        let is_streaming = response
            .headers()
            .get(axum::http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.contains("text/event-stream"))
            .unwrap_or(false);

        if RELAY_PATHS.contains(&endpoint.as_str()) {
            // For streams next.run() returns once headers are ready, so this is TTFB
            if is_streaming {
                tracing::info!(
                    "{} {} - status={} model={} ttfb={:.3}s",
                    method,
                    endpoint,
                    status_code,
                    model,
                    duration
                );
            } else {
                tracing::info!(
                    "{} {} - status={} model={} duration={:.3}s",
                    method,
                    endpoint,
                    status_code,
                    model,
                    duration
                );
            }
        } else {
            tracing::debug!(
                "{} {} - status={} duration={:.3}s",
                method,
                endpoint,
                status_code,
                duration
            );
        }

        metrics
            .active_requests
            .with_label_values(&[&endpoint])
            .dec();

        response
    }
}
