use crate::AppState;
use crate::api::handlers;
use axum::{
    Router,
    routing::{get, post},
};

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/research", post(handlers::research::research))
        .route("/context", get(handlers::context::get_context))
        .route("/openapi.json", get(handlers::openapi_json))
}
