use crate::{
    AppState,
    research::render::render_recommendations,
    types::{RecommendationSet, ResearchRequest, ResponseFormat, Result},
};
use axum::{
    Json,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};

/// Research a topic across the configured community sources
#[utoipa::path(
    post,
    path = "/api/research",
    request_body = ResearchRequest,
    responses(
        (status = 200, description = "Recommendations, as JSON or markdown per `response_format`", body = RecommendationSet),
        (status = 400, description = "Query too vague"),
        (status = 404, description = "No community results"),
        (status = 429, description = "Rate limit exhausted"),
        (status = 502, description = "Synthesis or source failure"),
        (status = 503, description = "No synthesis provider configured")
    ),
    tag = "research"
)]
pub async fn research(
    State(state): State<AppState>,
    Json(payload): Json<ResearchRequest>,
) -> Result<Response> {
    let (query, format) = payload.into_query();
    let set = state.orchestrator.research(query).await?;
    let body = render_recommendations(&set, format, state.config.output.character_limit);

    let content_type = match format {
        ResponseFormat::Json => "application/json",
        ResponseFormat::Markdown => "text/markdown; charset=utf-8",
    };
    Ok(([(header::CONTENT_TYPE, content_type)], body).into_response())
}
