//! API request and response models.
//!
//! This module defines the data structures of the inbound API (chat requests,
//! replies, configuration and the small status endpoints) and the subset of
//! the upstream chat-completions wire format the relay reads and writes.

use crate::core::config::{DEFAULT_MODEL, DEFAULT_TEMPERATURE};
use crate::core::{ErrorKind, UpstreamError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ============================================================================
// Conversation
// ============================================================================

/// Author of a message in the conversation history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({"role": "user", "content": "Hello!"}))]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Chat request as sent by the frontend.
///
/// `api_key` and `base_url` override the stored credentials for this call
/// only; they never modify the store.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "messages": [{"role": "user", "content": "Translate 'hello' to French"}],
    "model": "gpt-3.5-turbo",
    "stream": true
}))]
pub struct ChatRequest {
    /// Conversation history in turn order
    pub messages: Vec<ChatMessage>,

    /// Per-request api_key override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Per-request base_url override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Upstream model identifier
    #[serde(default = "default_model")]
    pub model: String,

    /// Relay the reply as an event stream
    #[serde(default = "default_stream")]
    pub stream: bool,

    /// Sampling temperature forwarded upstream
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_stream() -> bool {
    true
}

impl ChatRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            api_key: None,
            base_url: None,
            model: default_model(),
            stream: default_stream(),
            temperature: None,
        }
    }

    pub fn effective_temperature(&self) -> f32 {
        self.temperature.unwrap_or(DEFAULT_TEMPERATURE)
    }
}

/// Non-streaming chat reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "role": "assistant",
    "content": "Bonjour",
    "timestamp": "2024-05-01T12:00:00Z"
}))]
pub struct ChatReply {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatReply {
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// One step of a relayed stream. `Done` and `Error` are terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    Delta(String),
    Done,
    Error(UpstreamError),
}

impl ChatEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ChatEvent::Delta(_))
    }

    /// Label used for metrics.
    pub fn event_type(&self) -> &'static str {
        match self {
            ChatEvent::Delta(_) => "delta",
            ChatEvent::Done => "done",
            ChatEvent::Error(_) => "error",
        }
    }
}

impl From<UpstreamError> for ChatEvent {
    fn from(e: UpstreamError) -> Self {
        ChatEvent::Error(e)
    }
}

/// Payload of a delta event on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({"content": "Bon", "role": "assistant"}))]
pub struct StreamDeltaPayload {
    pub content: String,
    pub role: Role,
}

/// Payload of the error event that terminates a failed stream.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({"error": "upstream returned HTTP 401: Incorrect API key", "type": "auth"}))]
pub struct StreamErrorPayload {
    pub error: String,
    #[serde(rename = "type")]
    pub kind: ErrorKind,
}

// ============================================================================
// Configuration and models
// ============================================================================

/// Acknowledgement of a configuration change.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({"status": "ok", "message": "Configuration saved", "base_url": "https://api.openai.com/v1"}))]
pub struct ConfigAck {
    pub status: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

/// Chat-capable model identifiers.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({"models": ["gpt-4", "gpt-3.5-turbo"]}))]
pub struct ModelsResponse {
    pub models: Vec<String>,
}

/// Body of every request-level failure.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({"message": "No API key configured", "type": "missing_credentials", "code": 400}))]
pub struct ApiErrorDetail {
    pub message: String,
    /// Error kind, e.g. `auth` or `missing_credentials`
    #[serde(rename = "type")]
    pub error_type: String,
    pub code: u16,
}

// ============================================================================
// Status endpoints
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RootResponse {
    pub message: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HelloResponse {
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EchoRequest {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EchoResponse {
    pub echo: String,
    pub original: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StatusResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    /// Whether upstream credentials have been set
    pub configured: bool,
    pub uptime_secs: u64,
    pub timestamp: DateTime<Utc>,
}

// ============================================================================
// Upstream wire format (OpenAI-compatible chat completions)
// ============================================================================

/// Body sent to `{base_url}/chat/completions`.
#[derive(Debug, Clone, Serialize)]
pub struct UpstreamChatRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
    pub stream: bool,
    pub temperature: f32,
}

/// Non-streaming completion object. Only the fields the relay reads.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    pub message: ChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

/// Streaming response chunk.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamChunk {
    #[serde(default)]
    pub choices: Vec<StreamChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StreamChoice {
    #[serde(default)]
    pub delta: Delta,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Delta content in streaming responses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Delta {
    #[serde(default)]
    pub content: Option<String>,
}

/// Response of `{base_url}/models`.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelList {
    #[serde(default)]
    pub data: Vec<ModelInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelInfo {
    pub id: String,
}
