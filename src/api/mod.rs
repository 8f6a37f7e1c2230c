//! HTTP API Handlers and Routes
//!
//! The REST surface of the research server, built on Axum. It exposes the
//! same two operations as the MCP server plus a health probe and the
//! OpenAPI document.
//!
//! # Module Structure
//!
//! - [`api::handlers`](crate::api::handlers) - Request handlers for each endpoint
//! - [`api::routes`](crate::api::routes) - Route definitions and router configuration
//!
//! # API Endpoints
//!
//! - `POST /api/research` - Research a topic; JSON or markdown body
//! - `GET /api/context` - Workspace, provider, rate-limit and cache snapshot
//! - `GET /api/openapi.json` - OpenAPI document
//! - `GET /health` - Health check endpoint
//!
//! Errors are returned as JSON with `error`, `kind` and `action` fields.
//! Rate-limited responses also carry a `Retry-After` header.
//!
//! # OpenAPI Documentation
//!
//! When the `swagger-ui` feature is enabled, interactive API documentation
//! is available at `/swagger-ui/`.

/// Request and response handlers for all API endpoints.
pub mod handlers;
/// Router configuration and route definitions.
pub mod routes;

use crate::AppState;
use axum::{Router, routing::get};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "community-research",
        description = "Community-sourced research across Stack Overflow, GitHub, Reddit and Hacker News"
    ),
    paths(
        handlers::research::research,
        handlers::context::get_context,
        handlers::health::health,
    ),
    components(schemas(
        crate::types::ResearchRequest,
        crate::types::ResponseFormat,
        crate::types::Query,
        crate::types::RecommendationSet,
        crate::types::Recommendation,
        crate::types::EvidenceSignal,
        crate::types::Difficulty,
        crate::types::SourceSummary,
        crate::types::SourceStatus,
        crate::types::SourceKind,
        crate::types::ProviderDescriptor,
        crate::research::ServerContext,
        handlers::health::HealthResponse,
    )),
    tags(
        (name = "research", description = "Community research"),
        (name = "system", description = "Server state")
    )
)]
pub struct ApiDoc;

/// Full application router with middleware and state attached
pub fn app(state: AppState) -> Router {
    let router = Router::new()
        .route("/health", get(handlers::health::health))
        .nest("/api", routes::create_router());

    #[cfg(feature = "swagger-ui")]
    let router = router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
            .url("/api-docs/openapi.json", ApiDoc::openapi()),
    );

    router
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
