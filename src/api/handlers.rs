//! HTTP request handlers for the translate backend API.
//!
//! This module contains all endpoint handlers: the status endpoints used by
//! the desktop frontend, credential configuration, chat relaying, model
//! listing and metrics.

use crate::api::models::*;
use crate::api::streaming::create_sse_response;
use crate::core::config::AppConfig;
use crate::core::logging::{generate_request_id, REQUEST_ID};
use crate::core::{AppError, CredentialUpdate, ModelName, Result};
use crate::services::{ChatRelay, RelayOutcome};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use prometheus::{Encoder, TextEncoder};
use std::sync::Arc;
use std::time::Instant;

/// Name reported by the status endpoint.
pub const SERVICE_NAME: &str = "Translate Backend";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub relay: ChatRelay,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: AppConfig, relay: ChatRelay) -> Self {
        Self {
            config,
            relay,
            started_at: Instant::now(),
        }
    }
}

/// Service banner.
#[utoipa::path(
    get,
    path = "/",
    tag = "status",
    responses((status = 200, description = "Service is running", body = RootResponse))
)]
pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Translate App Backend API".to_string(),
        status: "running".to_string(),
    })
}

/// Basic health check endpoint.
#[utoipa::path(
    get,
    path = "/health",
    tag = "status",
    responses((status = 200, description = "Service is healthy", body = HealthResponse))
)]
pub async fn health() -> Json<HealthResponse> {
    tracing::debug!("Health check requested");
    Json(HealthResponse {
        status: "healthy".to_string(),
        message: "Backend service is running normally".to_string(),
    })
}

#[utoipa::path(
    get,
    path = "/api/v1/hello",
    tag = "status",
    responses((status = 200, description = "Greeting", body = HelloResponse))
)]
pub async fn hello() -> Json<HelloResponse> {
    Json(HelloResponse {
        message: "Hello from the Rust backend!".to_string(),
        timestamp: Utc::now(),
    })
}

/// Echo a message back to the caller.
#[utoipa::path(
    post,
    path = "/api/v1/echo",
    tag = "status",
    request_body = EchoRequest,
    responses(
        (status = 200, description = "Echoed message", body = EchoResponse),
        (status = 400, description = "Malformed body", body = ApiErrorResponse)
    )
)]
pub async fn echo(
    payload: std::result::Result<Json<EchoRequest>, JsonRejection>,
) -> Result<Json<EchoResponse>> {
    let Json(request) = payload?;
    Ok(Json(EchoResponse {
        echo: format!("Server received: {}", request.message),
        original: request.message,
        timestamp: Utc::now(),
    }))
}

/// Service status including whether upstream credentials are set.
#[utoipa::path(
    get,
    path = "/api/v1/status",
    tag = "status",
    responses((status = 200, description = "Service status", body = StatusResponse))
)]
pub async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "running".to_string(),
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        configured: state.relay.store().is_configured(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        timestamp: Utc::now(),
    })
}

/// Replace the stored upstream credentials.
///
/// Both fields are replaced; an omitted `base_url` resets to the default.
#[utoipa::path(
    post,
    path = "/api/v1/openai/config",
    tag = "openai",
    request_body = CredentialUpdate,
    responses(
        (status = 200, description = "Configuration saved", body = ConfigAck),
        (status = 400, description = "Malformed body", body = ApiErrorResponse)
    )
)]
#[tracing::instrument(skip(state, payload))]
pub async fn set_config(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<CredentialUpdate>, JsonRejection>,
) -> Result<Json<ConfigAck>> {
    let Json(update) = payload?;
    let credentials = update.into_credentials();
    let base_url = credentials.base_url.clone();
    state.relay.store().set(credentials);

    Ok(Json(ConfigAck {
        status: "ok".to_string(),
        message: "Configuration saved".to_string(),
        base_url: Some(base_url),
    }))
}

/// Forget the stored upstream credentials.
#[utoipa::path(
    delete,
    path = "/api/v1/openai/config",
    tag = "openai",
    responses((status = 200, description = "Configuration cleared", body = ConfigAck))
)]
#[tracing::instrument(skip(state))]
pub async fn clear_config(State(state): State<Arc<AppState>>) -> Json<ConfigAck> {
    state.relay.store().clear();
    Json(ConfigAck {
        status: "ok".to_string(),
        message: "Configuration cleared".to_string(),
        base_url: None,
    })
}

/// Relay a chat request to the upstream.
///
/// Returns a JSON [`ChatReply`] when `stream` is false, otherwise a
/// `text/event-stream` of delta frames ending in `[DONE]` or one error frame.
#[utoipa::path(
    post,
    path = "/api/v1/openai/chat",
    tag = "openai",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Chat reply, or a text/event-stream when `stream` is true", body = ChatReply),
        (status = 400, description = "Missing credentials or malformed body", body = ApiErrorResponse),
        (status = 401, description = "Upstream rejected the credentials", body = ApiErrorResponse),
        (status = 429, description = "Upstream rate limit", body = ApiErrorResponse),
        (status = 502, description = "Upstream unreachable or failed", body = ApiErrorResponse),
        (status = 504, description = "Upstream timed out", body = ApiErrorResponse)
    )
)]
pub async fn chat(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(request) = payload?;
    let request_id = generate_request_id();

    REQUEST_ID
        .scope(request_id.clone(), async move {
            let model = request.model.clone();
            tracing::info!(
                request_id = %request_id,
                model = %model,
                stream = request.stream,
                messages = request.messages.len(),
                "Chat request received"
            );

            let mut response = match state.relay.chat(request).await? {
                RelayOutcome::Reply(reply) => Json(reply).into_response(),
                RelayOutcome::Stream(stream) => create_sse_response(stream),
            };
            response.extensions_mut().insert(ModelName(model));
            Ok(response)
        })
        .await
}

/// List chat-capable models visible with the stored credentials.
#[utoipa::path(
    get,
    path = "/api/v1/openai/models",
    tag = "openai",
    responses(
        (status = 200, description = "Chat model identifiers", body = ModelsResponse),
        (status = 400, description = "Credentials not configured", body = ApiErrorResponse),
        (status = 401, description = "Upstream rejected the credentials", body = ApiErrorResponse),
        (status = 502, description = "Upstream unreachable or failed", body = ApiErrorResponse)
    )
)]
#[tracing::instrument(skip(state))]
pub async fn list_models(State(state): State<Arc<AppState>>) -> Result<Json<ModelsResponse>> {
    let request_id = generate_request_id();

    REQUEST_ID
        .scope(request_id.clone(), async move {
            tracing::debug!(request_id = %request_id, "Listing upstream models");
            let models = state.relay.list_models().await?;
            Ok(Json(ModelsResponse { models }))
        })
        .await
}

/// Prometheus metrics endpoint.
#[tracing::instrument]
pub async fn metrics_handler() -> Result<Response> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, encoder.format_type().to_string())],
        buffer,
    )
        .into_response())
}
