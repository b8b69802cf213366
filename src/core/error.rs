//! Error types and handling for the chat relay backend.
//!
//! [`UpstreamError`] is the uniform shape every upstream failure is translated
//! into. [`AppError`] wraps it together with the request-level failures of the
//! HTTP surface and implements proper HTTP response conversion.

use crate::core::error_types::{truncate_detail, ErrorKind, ERROR_TYPE_INTERNAL};
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// A failed call to the upstream chat-completion API.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} error: {detail}")]
pub struct UpstreamError {
    pub kind: ErrorKind,
    pub detail: String,
    /// Set when a deadline elapsed rather than the connection failing outright.
    pub timed_out: bool,
}

impl UpstreamError {
    pub fn new(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
            timed_out: false,
        }
    }

    pub fn transport(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transport, detail)
    }

    pub fn unknown(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unknown, detail)
    }

    /// A deadline elapsed while waiting on the upstream.
    pub fn timeout(what: &str, secs: u64) -> Self {
        Self {
            kind: ErrorKind::Transport,
            detail: format!("{} timed out after {} seconds", what, secs),
            timed_out: true,
        }
    }

    /// Build an error from a non-success upstream status and its body text.
    ///
    /// Prefers the OpenAI-style `error.message` field when the body carries
    /// one, otherwise uses the (truncated) raw text.
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| {
                v.get("error")
                    .and_then(|e| e.get("message").or(Some(e)))
                    .and_then(|m| m.as_str().map(str::to_string))
            })
            .unwrap_or_else(|| truncate_detail(body.trim()));

        let detail = if message.is_empty() {
            format!("upstream returned HTTP {}", status)
        } else {
            format!("upstream returned HTTP {}: {}", status, message)
        };
        Self::new(ErrorKind::from_status(status), detail)
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return Self {
                kind: ErrorKind::Transport,
                detail: e.to_string(),
                timed_out: true,
            };
        }
        if let Some(status) = e.status() {
            return Self::new(ErrorKind::from_status(status.as_u16()), e.to_string());
        }
        if e.is_decode() {
            return Self::unknown(format!("invalid upstream response: {}", e));
        }
        Self::transport(e.to_string())
    }
}

/// Main error type for the HTTP surface.
#[derive(Error, Debug)]
pub enum AppError {
    /// No api_key could be resolved from the request or the config store
    #[error("No API key configured: set one via /api/v1/openai/config or pass api_key")]
    MissingCredentials,

    /// Client provided invalid data
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The upstream call failed before any payload was committed
    #[error("Upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic internal server errors with custom message
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// The contractual kind reported to clients, if the error has one.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            AppError::MissingCredentials => Some(ErrorKind::MissingCredentials),
            AppError::BadRequest(_) => Some(ErrorKind::BadRequest),
            AppError::Upstream(e) => Some(e.kind),
            AppError::Serialization(_) | AppError::Internal(_) => None,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::MissingCredentials | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Upstream(e) => match e.kind {
                ErrorKind::Auth => StatusCode::UNAUTHORIZED,
                ErrorKind::RateLimit => StatusCode::TOO_MANY_REQUESTS,
                ErrorKind::Transport if e.timed_out => StatusCode::GATEWAY_TIMEOUT,
                ErrorKind::MissingCredentials | ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
                ErrorKind::Transport | ErrorKind::Unknown => StatusCode::BAD_GATEWAY,
            },
            AppError::Serialization(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_type = self
            .kind()
            .map(ErrorKind::as_str)
            .unwrap_or(ERROR_TYPE_INTERNAL);
        let error_message = match &self {
            AppError::Upstream(e) => e.detail.clone(),
            other => other.to_string(),
        };

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error_type, "{}", error_message);
        } else {
            tracing::warn!(status = status.as_u16(), error_type, "{}", error_message);
        }

        let body = Json(json!({
            "error": {
                "message": error_message,
                "type": error_type,
                "code": status.as_u16()
            }
        }));

        (status, body).into_response()
    }
}

/// Convenience type alias for Results using [`AppError`].
pub type Result<T> = std::result::Result<T, AppError>;
