//! Shared constants for structured API errors and the relay error taxonomy.

use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

pub const ERROR_KIND_MISSING_CREDENTIALS: &str = "missing_credentials";
pub const ERROR_KIND_AUTH: &str = "auth";
pub const ERROR_KIND_TRANSPORT: &str = "transport";
pub const ERROR_KIND_RATE_LIMIT: &str = "rate_limit";
pub const ERROR_KIND_UNKNOWN: &str = "unknown";
pub const ERROR_KIND_BAD_REQUEST: &str = "bad_request";

pub const ERROR_TYPE_INTERNAL: &str = "internal_error";

/// Upper bound for upstream error text carried in an error detail.
pub const MAX_ERROR_MESSAGE_LEN: usize = 500;

/// Contractual error classification. Callers branch on this, never on the
/// human-readable detail that accompanies it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    MissingCredentials,
    Auth,
    Transport,
    RateLimit,
    Unknown,
    BadRequest,
}

impl ErrorKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MissingCredentials => ERROR_KIND_MISSING_CREDENTIALS,
            Self::Auth => ERROR_KIND_AUTH,
            Self::Transport => ERROR_KIND_TRANSPORT,
            Self::RateLimit => ERROR_KIND_RATE_LIMIT,
            Self::Unknown => ERROR_KIND_UNKNOWN,
            Self::BadRequest => ERROR_KIND_BAD_REQUEST,
        }
    }

    /// Classify an upstream HTTP status code.
    pub fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => Self::Auth,
            429 => Self::RateLimit,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Truncate upstream error text on a char boundary.
pub fn truncate_detail(text: &str) -> String {
    if text.chars().count() <= MAX_ERROR_MESSAGE_LEN {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(MAX_ERROR_MESSAGE_LEN).collect();
    truncated.push_str("...");
    truncated
}
