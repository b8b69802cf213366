//! Server-Sent Events (SSE) encoding of relayed chat streams.
//!
//! Every event is one `data: <payload>\n\n` frame. Deltas carry
//! `{"content", "role":"assistant"}`, success ends with `data: [DONE]`, and a
//! failure ends with `{"error", "type"}` and no sentinel.

use crate::api::disconnect::DisconnectStream;
use crate::api::models::{ChatEvent, Role, StreamDeltaPayload, StreamErrorPayload};
use crate::services::RelayStream;
use axum::body::{Body, Bytes};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

/// End-of-stream sentinel frame.
pub const DONE_FRAME: &str = "data: [DONE]\n\n";

/// Encode one relay event as an SSE frame.
pub fn format_event(event: &ChatEvent) -> String {
    match event {
        ChatEvent::Delta(content) => data_frame(&StreamDeltaPayload {
            content: content.clone(),
            role: Role::Assistant,
        }),
        ChatEvent::Done => DONE_FRAME.to_string(),
        ChatEvent::Error(e) => data_frame(&StreamErrorPayload {
            error: e.detail.clone(),
            kind: e.kind,
        }),
    }
}

fn data_frame<T: serde::Serialize>(payload: &T) -> String {
    match serde_json::to_string(payload) {
        Ok(json) => format!("data: {}\n\n", json),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize stream payload");
            format!(
                "data: {{\"error\":\"failed to encode stream event\",\"type\":\"{}\"}}\n\n",
                crate::core::error_types::ERROR_TYPE_INTERNAL
            )
        }
    }
}

/// Build the streaming HTTP response for a relay stream.
///
/// The body owns the receiver. When the client goes away the body is dropped,
/// which fires the cancel handle and closes the channel so the producer stops.
pub fn create_sse_response(stream: RelayStream) -> Response {
    let RelayStream { mut events, cancel } = stream;

    let frames = Box::pin(async_stream::stream! {
        while let Some(event) = events.recv().await {
            let terminal = event.is_terminal();
            yield Ok::<Bytes, std::convert::Infallible>(Bytes::from(format_event(&event)));
            if terminal {
                break;
            }
        }
    });

    let body = Body::from_stream(DisconnectStream {
        stream: frames,
        cancel_handle: cancel,
    });

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
            (header::HeaderName::from_static("x-accel-buffering"), "no"),
        ],
        body,
    )
        .into_response()
}
