use crate::core::metrics::get_metrics;
use crate::core::StreamCancelHandle;
use axum::body::Bytes;
use futures::stream::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Body stream wrapper that fires its cancel handle when dropped.
///
/// Hyper drops the body when the client stops reading, which is how a
/// disconnect reaches the relay producer.
pub struct DisconnectStream<S> {
    pub stream: S,
    pub cancel_handle: StreamCancelHandle,
}

impl<S, E> Stream for DisconnectStream<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
{
    type Item = Result<Bytes, E>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.stream).poll_next(cx)
    }
}

impl<S> Drop for DisconnectStream<S> {
    fn drop(&mut self) {
        // A completed handle ignores cancel(), so a finished stream is not a disconnect
        if !self.cancel_handle.is_completed() {
            get_metrics().client_disconnects_total.inc();
            tracing::debug!("Response body dropped before the stream finished");
        }
        self.cancel_handle.cancel();
    }
}
