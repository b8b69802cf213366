//! API layer for the translate backend.
//!
//! This module contains all HTTP handlers, request/response models,
//! SSE encoding and router assembly.

pub mod disconnect;
pub mod docs;
pub mod handlers;
pub mod models;
pub mod router;
pub mod streaming;

// Re-export commonly used types
pub use docs::ApiDoc;
pub use handlers::AppState;
pub use models::{ChatEvent, ChatMessage, ChatReply, ChatRequest, Role};
pub use router::build_router;
pub use streaming::create_sse_response;
