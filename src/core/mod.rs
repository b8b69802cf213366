//! Core functionality for the chat relay backend.
//!
//! This module contains fundamental components used throughout the application:
//! - Configuration management and the runtime credential store
//! - Error handling
//! - Logging context and metrics
//! - HTTP middleware and stream cancellation

pub mod cancel;
pub mod config;
pub mod credentials;
pub mod error;
pub mod error_types;
pub mod logging;
pub mod metrics;
pub mod middleware;

// Re-export commonly used types
pub use cancel::StreamCancelHandle;
pub use config::{AppConfig, ServerConfig, UpstreamConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};
pub use credentials::{CredentialStore, CredentialUpdate, Credentials};
pub use error::{AppError, Result, UpstreamError};
pub use error_types::ErrorKind;
pub use logging::{generate_request_id, get_request_id, REQUEST_ID};
pub use metrics::{get_metrics, init_metrics, Metrics};
pub use middleware::{MetricsMiddleware, ModelName};
