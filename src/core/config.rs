//! Configuration management for the chat relay backend.
//!
//! Everything is read from environment variables (a `.env` file is loaded by
//! `main` before this runs). Upstream credentials are NOT part of this
//! configuration: they live in the runtime [`CredentialStore`] and are set
//! through the API. `OPENAI_API_KEY` / `OPENAI_BASE_URL` only seed that store
//! at startup.
//!
//! [`CredentialStore`]: crate::core::credentials::CredentialStore

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Canonical upstream endpoint used when no base URL has been supplied.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Model used when a chat request does not name one.
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Sampling temperature forwarded upstream when a request does not set one.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, CORS)
    #[serde(default)]
    pub server: ServerConfig,

    /// Upstream client configuration (timeouts, TLS)
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Capacity of the channel between the stream producer and the HTTP body
    #[serde(default = "default_stream_buffer_size")]
    pub stream_buffer_size: usize,

    /// Initial api_key seeded into the credential store
    #[serde(default, skip_serializing)]
    pub initial_api_key: Option<String>,

    /// Initial base_url seeded into the credential store
    #[serde(default)]
    pub initial_base_url: Option<String>,
}

/// Server-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind to
    #[serde(default = "default_port")]
    pub port: u16,

    /// Origins allowed by the CORS layer
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

/// Deadlines and TLS settings for calls to the upstream API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Bounds a non-streaming call, model listing, and opening a stream
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Bounds the wait for each chunk of a streaming response
    #[serde(default = "default_stream_chunk_timeout")]
    pub stream_chunk_timeout_secs: u64,

    /// TCP connect timeout
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Whether to verify SSL certificates for upstream requests
    #[serde(default = "default_verify_ssl")]
    pub verify_ssl: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: default_cors_origins(),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout(),
            stream_chunk_timeout_secs: default_stream_chunk_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            verify_ssl: default_verify_ssl(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            upstream: UpstreamConfig::default(),
            stream_buffer_size: default_stream_buffer_size(),
            initial_api_key: None,
            initial_base_url: None,
        }
    }
}

impl UpstreamConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn stream_chunk_timeout(&self) -> Duration {
        Duration::from_secs(self.stream_chunk_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:1420".to_string(),
        "tauri://localhost".to_string(),
        "http://tauri.localhost".to_string(),
    ]
}

fn default_request_timeout() -> u64 {
    300
}

fn default_stream_chunk_timeout() -> u64 {
    120
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_verify_ssl() -> bool {
    true
}

fn default_stream_buffer_size() -> usize {
    64
}

impl AppConfig {
    /// Build configuration from environment variables, falling back to
    /// defaults for anything unset.
    ///
    /// Malformed numeric values are an error rather than being silently
    /// ignored, so a typo in `PORT` does not bind the default port.
    pub fn from_env() -> Result<Self> {
        let mut config = AppConfig::default();

        if let Ok(host) = std::env::var("HOST") {
            config.server.host = host;
        }
        if let Some(port) = parse_env::<u16>("PORT")? {
            config.server.port = port;
        }
        if let Ok(origins) = std::env::var("CORS_ORIGINS") {
            config.server.cors_origins = parse_list(&origins);
        }

        if let Some(secs) = parse_env::<u64>("REQUEST_TIMEOUT_SECS")? {
            config.upstream.request_timeout_secs = secs.max(1);
        }
        if let Some(secs) = parse_env::<u64>("STREAM_CHUNK_TIMEOUT_SECS")? {
            config.upstream.stream_chunk_timeout_secs = secs.max(1);
        }
        if let Some(secs) = parse_env::<u64>("CONNECT_TIMEOUT_SECS")? {
            config.upstream.connect_timeout_secs = secs;
        }
        if let Ok(verify_ssl) = std::env::var("VERIFY_SSL") {
            config.upstream.verify_ssl = str_to_bool(&verify_ssl);
        }

        if let Some(size) = parse_env::<usize>("STREAM_BUFFER_SIZE")? {
            config.stream_buffer_size = size.max(1);
        }

        config.initial_api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());
        config.initial_base_url = std::env::var("OPENAI_BASE_URL")
            .ok()
            .filter(|u| !u.trim().is_empty());

        Ok(config)
    }

    /// Address string the listener binds to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn parse_env<T>(name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .with_context(|| format!("Invalid value for {}: {:?}", name, raw)),
        Err(_) => Ok(None),
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Convert string to boolean.
///
/// Accepts: "true", "1", "yes", "on" (case-insensitive)
fn str_to_bool(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "HOST",
        "PORT",
        "CORS_ORIGINS",
        "REQUEST_TIMEOUT_SECS",
        "STREAM_CHUNK_TIMEOUT_SECS",
        "CONNECT_TIMEOUT_SECS",
        "VERIFY_SSL",
        "STREAM_BUFFER_SIZE",
        "OPENAI_API_KEY",
        "OPENAI_BASE_URL",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn test_str_to_bool() {
        assert!(str_to_bool("true"));
        assert!(str_to_bool("True"));
        assert!(str_to_bool("1"));
        assert!(str_to_bool("yes"));
        assert!(str_to_bool("ON"));
        assert!(!str_to_bool("false"));
        assert!(!str_to_bool("0"));
        assert!(!str_to_bool("off"));
        assert!(!str_to_bool(""));
        assert!(!str_to_bool("invalid"));
    }

    #[test]
    fn test_parse_list() {
        assert_eq!(
            parse_list(" http://a , tauri://b,,"),
            vec!["http://a".to_string(), "tauri://b".to_string()]
        );
        assert!(parse_list("").is_empty());
    }

    #[test]
    fn test_default_values() {
        let config = AppConfig::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.bind_addr(), "127.0.0.1:8000");
        assert_eq!(config.server.cors_origins.len(), 3);
        assert_eq!(config.upstream.request_timeout_secs, 300);
        assert!(config.upstream.verify_ssl);
        assert_eq!(config.stream_buffer_size, 64);
        assert!(config.initial_api_key.is_none());
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        clear_env();
        let config = AppConfig::from_env().unwrap();
        assert_eq!(config.bind_addr(), "127.0.0.1:8000");
        assert!(config.initial_api_key.is_none());
        assert!(config.initial_base_url.is_none());
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        clear_env();
        std::env::set_var("HOST", "0.0.0.0");
        std::env::set_var("PORT", "9001");
        std::env::set_var("CORS_ORIGINS", "http://localhost:3000");
        std::env::set_var("STREAM_CHUNK_TIMEOUT_SECS", "15");
        std::env::set_var("VERIFY_SSL", "false");
        std::env::set_var("STREAM_BUFFER_SIZE", "0");
        std::env::set_var("OPENAI_API_KEY", "sk-env");

        let config = AppConfig::from_env().unwrap();
        assert_eq!(config.bind_addr(), "0.0.0.0:9001");
        assert_eq!(config.server.cors_origins, vec!["http://localhost:3000"]);
        assert_eq!(config.upstream.stream_chunk_timeout_secs, 15);
        assert!(!config.upstream.verify_ssl);
        assert_eq!(config.stream_buffer_size, 1);
        assert_eq!(config.initial_api_key.as_deref(), Some("sk-env"));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_zero_timeouts_are_clamped() {
        clear_env();
        std::env::set_var("REQUEST_TIMEOUT_SECS", "0");
        std::env::set_var("STREAM_CHUNK_TIMEOUT_SECS", "0");
        let config = AppConfig::from_env().unwrap();
        assert_eq!(config.upstream.request_timeout_secs, 1);
        assert_eq!(config.upstream.stream_chunk_timeout_secs, 1);
        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_invalid_port() {
        clear_env();
        std::env::set_var("PORT", "eighty");
        let result = AppConfig::from_env();
        assert!(result.is_err());
        clear_env();
    }

    #[test]
    #[serial]
    fn test_blank_api_key_is_ignored() {
        clear_env();
        std::env::set_var("OPENAI_API_KEY", "   ");
        let config = AppConfig::from_env().unwrap();
        assert!(config.initial_api_key.is_none());
        clear_env();
    }
}
