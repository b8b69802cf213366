//! Runtime store for upstream credentials.
//!
//! The store holds at most one [`Credentials`] value for the lifetime of the
//! process. Writes replace the whole value atomically and readers take an
//! `Arc` snapshot, so a chat call that resolved its credentials keeps using
//! them even if the store is updated while the call is in flight.

use crate::core::config::DEFAULT_BASE_URL;
use arc_swap::ArcSwapOption;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use utoipa::ToSchema;

/// API key and base URL used to authenticate to the upstream.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub api_key: String,
    pub base_url: String,
}

impl Credentials {
    /// Create credentials, normalizing the base URL. A missing or blank
    /// base URL becomes [`DEFAULT_BASE_URL`].
    pub fn new(api_key: impl Into<String>, base_url: Option<&str>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: normalize_base_url(base_url),
        }
    }

    /// True when the api_key is usable for an upstream call.
    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    /// Key suitable for logs.
    pub fn masked_key(&self) -> String {
        mask_key(&self.api_key)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.masked_key())
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Body of a set-configuration call.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[schema(example = json!({"api_key": "sk-...", "base_url": "https://api.openai.com/v1"}))]
pub struct CredentialUpdate {
    /// Upstream API key
    pub api_key: String,

    /// Upstream base URL; omitted means the default endpoint
    #[serde(default)]
    pub base_url: Option<String>,
}

impl CredentialUpdate {
    /// Turn an update into the value that replaces the stored credentials.
    ///
    /// Both fields are always replaced: an omitted `base_url` resets to the
    /// default endpoint instead of keeping the previously stored one.
    pub fn into_credentials(self) -> Credentials {
        if self.base_url.as_deref().map_or(true, |u| u.trim().is_empty()) {
            tracing::info!(
                base_url = DEFAULT_BASE_URL,
                "No base_url in configuration update, resetting to default"
            );
        }
        Credentials::new(self.api_key, self.base_url.as_deref())
    }
}

/// Process-wide holder of the last-set credentials. Not persisted.
#[derive(Default)]
pub struct CredentialStore {
    current: ArcSwapOption<Credentials>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that starts out configured.
    pub fn with_credentials(credentials: Credentials) -> Self {
        Self {
            current: ArcSwapOption::from_pointee(credentials),
        }
    }

    /// Replace the stored credentials entirely. Last write wins.
    pub fn set(&self, credentials: Credentials) {
        tracing::info!(
            api_key = %credentials.masked_key(),
            base_url = %credentials.base_url,
            "Upstream credentials updated"
        );
        self.current.store(Some(Arc::new(credentials)));
    }

    /// Snapshot of the stored credentials, if any have been set.
    pub fn get(&self) -> Option<Arc<Credentials>> {
        self.current.load_full()
    }

    /// Return to the unconfigured state.
    pub fn clear(&self) {
        self.current.store(None);
        tracing::info!("Upstream credentials cleared");
    }

    /// True when a usable api_key is stored.
    pub fn is_configured(&self) -> bool {
        self.get().is_some_and(|c| c.has_api_key())
    }
}

/// Trim whitespace and trailing slashes; blank means the default endpoint.
pub fn normalize_base_url(base_url: Option<&str>) -> String {
    match base_url.map(str::trim) {
        Some(url) if !url.is_empty() => url.trim_end_matches('/').to_string(),
        _ => DEFAULT_BASE_URL.to_string(),
    }
}

/// Mask an API key for logging, keeping a short prefix and suffix.
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "***".to_string();
    }
    let prefix: String = chars[..4].iter().collect();
    let suffix: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", prefix, suffix)
}
