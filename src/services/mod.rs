//! Business logic services for the chat relay.
//!
//! - [`relay`]: credential resolution and dispatch
//! - [`upstream`]: the adapter to OpenAI-compatible APIs
//! - [`sse`]: incremental parsing of the upstream event stream

pub mod relay;
pub mod sse;
pub mod upstream;

// Re-export commonly used types
pub use relay::{ChatRelay, RelayOutcome, RelayStream};
pub use sse::{SseEvent, SseParser};
pub use upstream::{
    build_http_client, filter_chat_models, ChatCall, ChatEventStream, ChatUpstream, OpenAiUpstream,
};
