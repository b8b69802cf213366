//! Router assembly: routes, CORS, tracing and metrics layers.

use crate::api::docs::ApiDoc;
use crate::api::handlers::{
    chat, clear_config, echo, health, hello, list_models, metrics_handler, root, set_config,
    status, AppState,
};
use crate::core::config::ServerConfig;
use crate::core::MetricsMiddleware;
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Build router with all endpoints.
pub fn build_router(state: Arc<AppState>) -> Router {
    let swagger_ui = SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi());
    let cors = cors_layer(&state.config.server);

    let api_routes = Router::new()
        .route("/api/v1/hello", get(hello))
        .route("/api/v1/echo", post(echo))
        .route("/api/v1/status", get(status))
        .route("/api/v1/openai/config", post(set_config).delete(clear_config))
        .route("/api/v1/openai/chat", post(chat))
        .route("/api/v1/openai/models", get(list_models))
        .layer(axum::middleware::from_fn(MetricsMiddleware::track_metrics))
        .with_state(state);

    Router::new()
        .merge(swagger_ui)
        .merge(api_routes)
        .route("/", get(root))
        .route("/health", get(health))
        .route("/metrics", get(metrics_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// CORS for the desktop frontend.
///
/// A `*` entry allows any origin, in which case credentials are not allowed.
pub fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT]);

    if config.cors_origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    layer
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
}
