//! HTTP layer: router composition and OpenAPI document.
//!
//! The application router carries the health check and the WebSocket chat
//! endpoint. With the `swagger-ui` feature the OpenAPI document is served
//! at `/api-docs/openapi.json` with a browser UI under `/swagger-ui`.

pub mod handlers;

use axum::Router;
use axum::routing::get;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::app_state::AppState;
use crate::ws::handler::ws_handler;

/// OpenAPI description of the HTTP routes.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "courier-gateway",
        description = "Real-time direct messaging over WebSocket"
    ),
    paths(
        handlers::system::health_handler,
        crate::ws::handler::ws_handler,
    ),
    components(schemas(
        handlers::system::HealthResponse,
        crate::error::ErrorResponse,
        crate::error::ErrorBody,
        crate::error::ErrorKind,
    )),
    tags(
        (name = "System", description = "Service status"),
        (name = "Chat", description = "WebSocket chat sessions"),
    )
)]
pub struct ApiDoc;

/// Builds the route table without state, for composition.
pub fn build_router() -> Router<AppState> {
    Router::new()
        .merge(handlers::system::routes())
        .route("/ws/chat", get(ws_handler))
}

/// Builds the complete application: routes, layers and shared state.
pub fn build_app(state: AppState) -> Router {
    let router = build_router();

    #[cfg(feature = "swagger-ui")]
    let router = router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
            .url("/api-docs/openapi.json", ApiDoc::openapi()),
    );

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
