//! Upstream client adapter for OpenAI-compatible chat-completion APIs.
//!
//! Every failure is translated into an [`UpstreamError`]. The streaming
//! variant never fails out-of-band: it yields a lazy sequence of
//! [`ChatEvent`]s that always ends with exactly one terminal event
//! (`Done` or `Error`).

use crate::api::models::{
    ChatCompletionResponse, ChatEvent, ChatMessage, ChatReply, ModelList, StreamChunk,
    UpstreamChatRequest,
};
use crate::core::config::UpstreamConfig;
use crate::core::{Credentials, ErrorKind, UpstreamError};
use crate::services::sse::{SseEvent, SseParser};
use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use std::time::Duration;

/// Bytes of a non-event-stream body kept for the plain completion fallback.
const PLAIN_BODY_LIMIT: usize = 1024 * 1024;

/// Stream of relay events produced by a streaming call.
pub type ChatEventStream = BoxStream<'static, ChatEvent>;

/// Everything needed for one chat-completion call.
#[derive(Debug, Clone)]
pub struct ChatCall {
    pub credentials: Credentials,
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
}

/// Contract of the upstream chat-completion API.
#[async_trait]
pub trait ChatUpstream: Send + Sync {
    /// Blocking request/response completion.
    async fn complete(&self, call: &ChatCall) -> Result<ChatReply, UpstreamError>;

    /// Open a streaming completion. Nothing is sent until the stream is polled.
    fn stream(&self, call: ChatCall) -> ChatEventStream;

    /// Chat-capable model identifiers, in upstream order.
    async fn list_models(&self, credentials: &Credentials) -> Result<Vec<String>, UpstreamError>;
}

/// Keep only chat models: identifiers containing "gpt", case-insensitively.
pub fn filter_chat_models(ids: impl IntoIterator<Item = String>) -> Vec<String> {
    ids.into_iter()
        .filter(|id| id.to_lowercase().contains("gpt"))
        .collect()
}

/// Build the shared HTTP client for upstream calls.
///
/// No whole-request timeout is set: streams may legitimately run for minutes.
/// Deadlines are applied per phase by [`OpenAiUpstream`].
pub fn build_http_client(config: &UpstreamConfig) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .danger_accept_invalid_certs(!config.verify_ssl)
        .connect_timeout(config.connect_timeout())
        .pool_idle_timeout(Duration::from_secs(90))
        .tcp_keepalive(Duration::from_secs(60))
        .build()
}

/// reqwest-backed adapter for OpenAI-compatible endpoints.
#[derive(Clone)]
pub struct OpenAiUpstream {
    client: reqwest::Client,
    request_timeout: Duration,
    chunk_timeout: Duration,
}

impl OpenAiUpstream {
    pub fn new(client: reqwest::Client, config: &UpstreamConfig) -> Self {
        Self {
            client,
            request_timeout: config.request_timeout(),
            chunk_timeout: config.stream_chunk_timeout(),
        }
    }
}

/// Send a chat-completions request and check the status.
async fn send_chat(
    client: &reqwest::Client,
    call: &ChatCall,
    stream: bool,
) -> Result<reqwest::Response, UpstreamError> {
    let url = format!("{}/chat/completions", call.credentials.base_url);
    let body = UpstreamChatRequest {
        model: &call.model,
        messages: &call.messages,
        stream,
        temperature: call.temperature,
    };

    tracing::debug!(
        url = %url,
        model = %call.model,
        messages = call.messages.len(),
        stream,
        api_key = %call.credentials.masked_key(),
        "Sending chat completion request upstream"
    );

    let response = client
        .post(&url)
        .bearer_auth(&call.credentials.api_key)
        .json(&body)
        .send()
        .await
        .map_err(|e| {
            tracing::warn!(
                url = %url,
                error = %e,
                is_timeout = e.is_timeout(),
                is_connect = e.is_connect(),
                "HTTP request failed to upstream"
            );
            UpstreamError::from(e)
        })?;

    check_status(response).await
}

/// Turn a non-2xx response into an [`UpstreamError`] carrying its body text.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, UpstreamError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    let err = UpstreamError::from_status(status.as_u16(), &text);
    tracing::warn!(status = status.as_u16(), kind = %err.kind, "Upstream returned error status");
    Err(err)
}

/// Await `fut`, mapping an elapsed deadline to a transport timeout.
async fn with_deadline<T, F>(deadline: Duration, what: &str, fut: F) -> Result<T, UpstreamError>
where
    F: std::future::Future<Output = Result<T, UpstreamError>>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => Err(UpstreamError::timeout(what, deadline.as_secs())),
    }
}

#[async_trait]
impl ChatUpstream for OpenAiUpstream {
    async fn complete(&self, call: &ChatCall) -> Result<ChatReply, UpstreamError> {
        with_deadline(self.request_timeout, "chat completion", async {
            let response = send_chat(&self.client, call, false).await?;
            let completion: ChatCompletionResponse = response.json().await?;
            let choice = completion
                .choices
                .into_iter()
                .next()
                .ok_or_else(|| UpstreamError::unknown("upstream response contained no choices"))?;
            Ok::<_, UpstreamError>(ChatReply::assistant(
                choice.message.content.unwrap_or_default(),
            ))
        })
        .await
    }

    fn stream(&self, call: ChatCall) -> ChatEventStream {
        let client = self.client.clone();
        let open_timeout = self.request_timeout;
        let chunk_timeout = self.chunk_timeout;

        Box::pin(async_stream::stream! {
            let opened = with_deadline(
                open_timeout,
                "opening chat stream",
                send_chat(&client, &call, true),
            )
            .await;
            let response = match opened {
                Ok(response) => response,
                Err(e) => {
                    yield ChatEvent::Error(e);
                    return;
                }
            };

            let mut body = response.bytes_stream();
            let mut parser = SseParser::new();
            // Kept until the first data event, for upstreams that ignore `stream: true`
            let mut raw: Vec<u8> = Vec::new();
            let mut saw_data = false;

            loop {
                let next = match tokio::time::timeout(chunk_timeout, body.next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        yield ChatEvent::Error(UpstreamError::timeout(
                            "waiting for next stream chunk",
                            chunk_timeout.as_secs(),
                        ));
                        return;
                    }
                };

                let (events, body_ended) = match next {
                    Some(Ok(bytes)) => {
                        if !saw_data && raw.len() < PLAIN_BODY_LIMIT {
                            raw.extend_from_slice(&bytes);
                        }
                        (parser.parse(&bytes), false)
                    }
                    Some(Err(e)) => {
                        yield ChatEvent::Error(UpstreamError::transport(format!(
                            "stream interrupted: {}",
                            e
                        )));
                        return;
                    }
                    None => (parser.finish().into_iter().collect::<Vec<_>>(), true),
                };

                if !saw_data && events.iter().any(|e| e.data.is_some()) {
                    saw_data = true;
                    raw = Vec::new();
                }

                for event in events {
                    if let Some(out) = interpret_sse_event(&event) {
                        let terminal = out.is_terminal();
                        yield out;
                        if terminal {
                            return;
                        }
                    }
                }

                if body_ended {
                    break;
                }
            }

            if !saw_data {
                for event in plain_body_events(&raw) {
                    yield event;
                }
                return;
            }

            // Body ended without an explicit [DONE]; the response is complete.
            yield ChatEvent::Done;
        })
    }

    async fn list_models(&self, credentials: &Credentials) -> Result<Vec<String>, UpstreamError> {
        let url = format!("{}/models", credentials.base_url);
        with_deadline(self.request_timeout, "model listing", async {
            let response = self
                .client
                .get(&url)
                .bearer_auth(&credentials.api_key)
                .send()
                .await?;
            let list: ModelList = check_status(response).await?.json().await?;
            Ok::<_, UpstreamError>(filter_chat_models(list.data.into_iter().map(|m| m.id)))
        })
        .await
    }
}

/// Map one upstream SSE event to a relay event. `None` means nothing to forward
/// (role-only deltas, keep-alives, finish markers).
pub fn interpret_sse_event(event: &SseEvent) -> Option<ChatEvent> {
    let data = event.data.as_deref()?.trim();
    if data.is_empty() {
        return None;
    }
    if data == "[DONE]" {
        return Some(ChatEvent::Done);
    }

    let value: serde_json::Value = match serde_json::from_str(data) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(error = %e, "Skipping undecodable upstream stream event");
            return None;
        }
    };

    if let Some(error) = value.get("error").filter(|e| !e.is_null()) {
        return Some(ChatEvent::Error(stream_error_from_payload(error)));
    }

    let chunk: StreamChunk = serde_json::from_value(value).ok()?;
    chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
        .filter(|content| !content.is_empty())
        .map(ChatEvent::Delta)
}

/// Events for a 200 body that carried no SSE data at all.
///
/// A plain `chat.completion` object is relayed as one delta followed by
/// `Done`. Anything else ends the stream with an error.
fn plain_body_events(raw: &[u8]) -> Vec<ChatEvent> {
    let value: serde_json::Value = match serde_json::from_slice(raw) {
        Ok(value) => value,
        Err(_) => {
            tracing::warn!(bytes = raw.len(), "Upstream stream body was not an event stream");
            return vec![ChatEvent::Error(UpstreamError::unknown(
                "upstream response was not an event stream",
            ))];
        }
    };

    if let Some(error) = value.get("error").filter(|e| !e.is_null()) {
        return vec![ChatEvent::Error(stream_error_from_payload(error))];
    }

    let completion = serde_json::from_value::<ChatCompletionResponse>(value)
        .ok()
        .and_then(|c| c.choices.into_iter().next());
    match completion {
        Some(choice) => {
            tracing::debug!("Upstream answered a stream call with a plain completion");
            let mut events = Vec::with_capacity(2);
            if let Some(content) = choice.message.content.filter(|c| !c.is_empty()) {
                events.push(ChatEvent::Delta(content));
            }
            events.push(ChatEvent::Done);
            events
        }
        None => vec![ChatEvent::Error(UpstreamError::unknown(
            "upstream response was not an event stream",
        ))],
    }
}

/// Classify an `error` object delivered inside an otherwise successful stream.
fn stream_error_from_payload(error: &serde_json::Value) -> UpstreamError {
    let message = error
        .get("message")
        .and_then(|m| m.as_str())
        .or_else(|| error.as_str())
        .unwrap_or("upstream reported an error mid-stream");
    let marker = [error.get("type"), error.get("code")]
        .into_iter()
        .flatten()
        .filter_map(|v| v.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    let kind = if marker.contains("rate_limit") {
        ErrorKind::RateLimit
    } else if marker.contains("invalid_api_key") || marker.contains("authentication") {
        ErrorKind::Auth
    } else {
        ErrorKind::Unknown
    };
    UpstreamError::new(kind, message)
}
