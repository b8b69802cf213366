//! Translate Backend - Main entry point
//!
//! This binary creates and runs the HTTP server with all configured routes and middleware.

use anyhow::{Context, Result};
use std::sync::Arc;
use translate_backend::{
    build_router,
    core::{init_metrics, logging::init_tracing, AppConfig, CredentialStore, Credentials},
    services::build_http_client,
    AppState, ChatRelay, OpenAiUpstream,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (before reading any environment variables)
    dotenvy::dotenv().ok();

    init_tracing();
    init_metrics();

    let config = AppConfig::from_env()?;

    let store = Arc::new(match &config.initial_api_key {
        Some(api_key) => {
            let credentials = Credentials::new(api_key.clone(), config.initial_base_url.as_deref());
            tracing::info!(
                api_key = %credentials.masked_key(),
                base_url = %credentials.base_url,
                "Upstream credentials seeded from environment"
            );
            CredentialStore::with_credentials(credentials)
        }
        None => {
            tracing::info!("No upstream credentials configured yet, waiting for /api/v1/openai/config");
            CredentialStore::new()
        }
    });

    let http_client =
        build_http_client(&config.upstream).context("Failed to build upstream HTTP client")?;
    if !config.upstream.verify_ssl {
        tracing::warn!("SSL verification disabled for upstream requests");
    }
    let upstream = Arc::new(OpenAiUpstream::new(http_client, &config.upstream));
    let relay = ChatRelay::new(store, upstream, config.stream_buffer_size);

    let bind_addr = config.bind_addr();
    let state = Arc::new(AppState::new(config, relay));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;

    tracing::info!("Starting server on http://{}", bind_addr);
    tracing::info!("API docs available at http://{}/docs", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, draining connections");
}
