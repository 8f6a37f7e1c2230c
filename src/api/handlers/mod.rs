//! API request handlers.

/// Server context snapshot.
pub mod context;
/// Liveness probe.
pub mod health;
/// Community research.
pub mod research;

use axum::Json;
use utoipa::OpenApi;

/// Serve the generated OpenAPI document
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(super::ApiDoc::openapi())
}
