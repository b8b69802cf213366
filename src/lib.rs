//! Translate Backend - local HTTP service relaying chat completions
//!
//! This library backs the translation desktop app. It stores upstream
//! credentials at runtime and forwards chat requests to an OpenAI-compatible
//! API, either as a single JSON reply or as a Server-Sent Events stream.
//!
//! # Architecture
//!
//! The codebase is organized into three main layers:
//!
//! - [`core`]: Core functionality (config, credential store, errors, logging, metrics)
//! - [`api`]: HTTP handlers, request/response models, SSE encoding and the router
//! - [`services`]: The chat relay and the upstream client adapter
//!
//! # Configuration
//!
//! All settings are optional environment variables:
//! - `HOST`: Server bind address (default: 127.0.0.1)
//! - `PORT`: Server port (default: 8000)
//! - `CORS_ORIGINS`: Comma-separated allowed origins
//! - `REQUEST_TIMEOUT_SECS`: Upstream request timeout in seconds (default: 300)
//! - `STREAM_CHUNK_TIMEOUT_SECS`: Max wait between stream chunks (default: 120)
//! - `VERIFY_SSL`: Verify SSL certificates for upstream (default: true)
//! - `OPENAI_API_KEY` / `OPENAI_BASE_URL`: Initial upstream credentials

pub mod api;
pub mod core;
pub mod services;

// Re-export commonly used types for convenience
pub use api::{build_router, ApiDoc, AppState};
pub use core::{AppConfig, AppError, CredentialStore, Credentials, Result, UpstreamError};
pub use services::{ChatRelay, ChatUpstream, OpenAiUpstream};
