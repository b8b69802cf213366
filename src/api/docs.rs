//! OpenAPI document served by the Swagger UI.

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Translate App Backend",
        description = "Local backend relaying chat completions to an OpenAI-compatible API"
    ),
    paths(
        crate::api::handlers::root,
        crate::api::handlers::health,
        crate::api::handlers::hello,
        crate::api::handlers::echo,
        crate::api::handlers::status,
        crate::api::handlers::set_config,
        crate::api::handlers::clear_config,
        crate::api::handlers::chat,
        crate::api::handlers::list_models,
    ),
    components(
        schemas(
            crate::api::models::Role,
            crate::api::models::ChatMessage,
            crate::api::models::ChatRequest,
            crate::api::models::ChatReply,
            crate::api::models::StreamDeltaPayload,
            crate::api::models::StreamErrorPayload,
            crate::api::models::ConfigAck,
            crate::api::models::ModelsResponse,
            crate::api::models::ApiErrorResponse,
            crate::api::models::ApiErrorDetail,
            crate::api::models::RootResponse,
            crate::api::models::HealthResponse,
            crate::api::models::HelloResponse,
            crate::api::models::EchoRequest,
            crate::api::models::EchoResponse,
            crate::api::models::StatusResponse,
            crate::core::CredentialUpdate,
            crate::core::ErrorKind,
        )
    ),
    tags(
        (name = "status", description = "Liveness and status endpoints"),
        (name = "openai", description = "Upstream configuration and chat relay")
    )
)]
pub struct ApiDoc;
