//! Chat relay: credential resolution and dispatch to the upstream adapter.
//!
//! A chat request moves through
//! `ResolvingCredentials -> Dispatching -> {Streaming | SingleShot} -> Completed | Failed`.
//! Credentials are resolved (and may fail) before anything is sent upstream.
//! Once a stream is dispatched every later failure travels in-stream as the
//! single terminal [`ChatEvent::Error`].

use crate::api::models::{ChatEvent, ChatReply, ChatRequest};
use crate::core::logging::{get_request_id, REQUEST_ID};
use crate::core::metrics::get_metrics;
use crate::core::{
    AppError, CredentialStore, Credentials, Result, StreamCancelHandle, UpstreamError,
};
use crate::services::upstream::{ChatCall, ChatEventStream, ChatUpstream};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::Instrument;

/// Result of a dispatched chat request.
pub enum RelayOutcome {
    Reply(ChatReply),
    Stream(RelayStream),
}

/// Receiving side of a streaming relay.
///
/// The producer stops as soon as `cancel` fires or `events` is dropped.
pub struct RelayStream {
    pub events: mpsc::Receiver<ChatEvent>,
    pub cancel: StreamCancelHandle,
}

/// Routes chat requests to the upstream using stored or per-request credentials.
#[derive(Clone)]
pub struct ChatRelay {
    store: Arc<CredentialStore>,
    upstream: Arc<dyn ChatUpstream>,
    stream_buffer_size: usize,
}

impl ChatRelay {
    pub fn new(
        store: Arc<CredentialStore>,
        upstream: Arc<dyn ChatUpstream>,
        stream_buffer_size: usize,
    ) -> Self {
        Self {
            store,
            upstream,
            stream_buffer_size: stream_buffer_size.max(1),
        }
    }

    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    /// Work out the credentials for one call.
    ///
    /// A non-empty `api_key` override wins over the stored key. `base_url`
    /// comes from the override, then the store, then the default endpoint.
    /// The store is read once, so a concurrent update cannot mix two values.
    pub fn resolve_credentials(
        &self,
        api_key: Option<&str>,
        base_url: Option<&str>,
    ) -> Result<Credentials> {
        let stored = self.store.get();

        let api_key = api_key
            .filter(|k| !k.trim().is_empty())
            .map(str::to_string)
            .or_else(|| {
                stored
                    .as_ref()
                    .filter(|c| c.has_api_key())
                    .map(|c| c.api_key.clone())
            })
            .ok_or(AppError::MissingCredentials)?;

        let base_url = base_url
            .filter(|u| !u.trim().is_empty())
            .or_else(|| stored.as_ref().map(|c| c.base_url.as_str()));

        Ok(Credentials::new(api_key, base_url))
    }

    /// Dispatch a chat request.
    ///
    /// Non-streaming failures are returned as errors with no partial payload.
    /// Streaming requests return as soon as the producer task is started.
    #[tracing::instrument(
        skip(self, request),
        fields(model = %request.model, stream = request.stream, messages = request.messages.len())
    )]
    pub async fn chat(&self, request: ChatRequest) -> Result<RelayOutcome> {
        let credentials =
            self.resolve_credentials(request.api_key.as_deref(), request.base_url.as_deref())?;
        let temperature = request.effective_temperature();
        let call = ChatCall {
            credentials,
            model: request.model,
            messages: request.messages,
            temperature,
        };

        if request.stream {
            return Ok(RelayOutcome::Stream(self.start_stream(call)));
        }

        let start = Instant::now();
        let result = self.upstream.complete(&call).await;
        observe_upstream("chat", start, result.as_ref().err());

        let reply = result?;
        tracing::debug!(chars = reply.content.len(), "Chat completion received");
        Ok(RelayOutcome::Reply(reply))
    }

    /// Chat-capable models visible with the stored credentials.
    #[tracing::instrument(skip(self))]
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let credentials = self.resolve_credentials(None, None)?;

        let start = Instant::now();
        let result = self.upstream.list_models(&credentials).await;
        observe_upstream("list_models", start, result.as_ref().err());

        let models = result?;
        tracing::debug!(count = models.len(), "Models listed");
        Ok(models)
    }

    fn start_stream(&self, call: ChatCall) -> RelayStream {
        let (tx, rx) = mpsc::channel(self.stream_buffer_size);
        let cancel = StreamCancelHandle::new();
        let upstream = self.upstream.stream(call);

        let producer = pump(upstream, tx, cancel.clone()).instrument(tracing::Span::current());
        tokio::spawn(REQUEST_ID.scope(get_request_id(), producer));

        RelayStream { events: rx, cancel }
    }
}

/// Forward adapter events into the channel until a terminal event is sent or
/// the consumer goes away.
async fn pump(
    mut upstream: ChatEventStream,
    tx: mpsc::Sender<ChatEvent>,
    cancel: StreamCancelHandle,
) {
    let metrics = get_metrics();
    metrics.active_streams.inc();
    let start = Instant::now();
    let mut deltas = 0usize;

    loop {
        let event = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!(deltas, "Client disconnected, abandoning upstream stream");
                break;
            }
            _ = tx.closed() => {
                tracing::info!(deltas, "Stream consumer closed, abandoning upstream stream");
                break;
            }
            // An adapter that ends without a terminal event has finished normally
            next = upstream.next() => next.unwrap_or(ChatEvent::Done),
        };

        metrics
            .stream_events
            .with_label_values(&[event.event_type()])
            .inc();

        let terminal = event.is_terminal();
        match &event {
            ChatEvent::Delta(_) => deltas += 1,
            ChatEvent::Done => {
                observe_upstream("chat_stream", start, None);
                tracing::debug!(deltas, "Stream completed");
            }
            ChatEvent::Error(e) => {
                observe_upstream("chat_stream", start, Some(e));
                tracing::warn!(deltas, kind = %e.kind, "Stream failed: {}", e.detail);
            }
        }
        if terminal {
            cancel.mark_completed();
        }

        if tx.send(event).await.is_err() {
            tracing::debug!("Stream consumer dropped before event was delivered");
            break;
        }
        if terminal {
            break;
        }
    }

    drop(upstream);
    metrics.active_streams.dec();
}

fn observe_upstream(operation: &str, start: Instant, error: Option<&UpstreamError>) {
    let metrics = get_metrics();
    metrics
        .upstream_latency
        .with_label_values(&[operation])
        .observe(start.elapsed().as_secs_f64());
    if let Some(e) = error {
        metrics
            .upstream_errors
            .with_label_values(&[operation, e.kind.as_str()])
            .inc();
    }
}
