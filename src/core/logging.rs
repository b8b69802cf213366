//! Request-scoped logging context.
//!
//! Each chat or model-listing request runs inside a [`REQUEST_ID`] scope so
//! that logs emitted deep in the relay (including from the stream producer
//! task) can be correlated with the inbound request.

use chrono::Local;

tokio::task_local! {
    /// Task-local storage for the current request ID.
    pub static REQUEST_ID: String;
}

/// Get the current request ID from context, if set.
///
/// Returns an empty string if no request ID is set.
pub fn get_request_id() -> String {
    REQUEST_ID.try_with(|id| id.clone()).unwrap_or_default()
}

/// Generate a new unique request ID using UUID v4.
pub fn generate_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Timer for the fmt layer that uses the local timezone (respects `TZ`).
pub struct LocalTime;

impl tracing_subscriber::fmt::time::FormatTime for LocalTime {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        let now = Local::now();
        write!(w, "{}", now.format("%Y-%m-%d %H:%M:%S"))
    }
}

/// Build the env filter. Noise from the HTTP stack is always suppressed, even
/// when `RUST_LOG` asks for trace output.
pub fn build_env_filter(rust_log: Option<&str>) -> tracing_subscriber::EnvFilter {
    let base_filter = rust_log.unwrap_or("info,translate_backend=debug");
    let filter_str = format!(
        "{},hyper=warn,hyper::proto=warn,h2=warn,reqwest=warn",
        base_filter
    );
    tracing_subscriber::EnvFilter::new(filter_str)
}

/// Install the global tracing subscriber.
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let no_color = std::env::var("NO_COLOR").is_ok();
    let rust_log = std::env::var("RUST_LOG").ok();

    tracing_subscriber::registry()
        .with(build_env_filter(rust_log.as_deref()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_timer(LocalTime)
                .with_ansi(!no_color),
        )
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_outside_scope() {
        assert_eq!(get_request_id(), "");
    }

    #[tokio::test]
    async fn test_request_id_inside_scope() {
        let id = generate_request_id();
        let seen = REQUEST_ID.scope(id.clone(), async { get_request_id() }).await;
        assert_eq!(seen, id);
    }

    #[test]
    fn test_generate_request_id_unique() {
        let a = generate_request_id();
        let b = generate_request_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 36);
    }

    #[test]
    fn test_env_filter_appends_noise_suppression() {
        let filter = build_env_filter(Some("trace"));
        let rendered = filter.to_string();
        assert!(rendered.contains("hyper=warn"));
        assert!(rendered.contains("reqwest=warn"));
    }
}
