//! HTTP surface tests using axum-test.

mod common;

use axum_test::TestServer;
use common::mocks::{CountingSource, ScriptedFactory, hit, orchestrator, recommendations_reply};
use community_research::sources::SourceClient;
use community_research::types::{RecommendationSet, SourceKind};
use community_research::{AppState, ResearchConfig, api};
use serde_json::json;
use std::sync::Arc;

fn server_with(factory: ScriptedFactory, config: ResearchConfig) -> TestServer {
    let sources: Vec<Arc<dyn SourceClient>> = vec![Arc::new(CountingSource::ok(
        SourceKind::StackExchangeLike,
        vec![hit(SourceKind::StackExchangeLike, "Celery with FastAPI", 412)],
    ))];
    let state = AppState {
        orchestrator: Arc::new(orchestrator(&config, sources, factory)),
        config: Arc::new(config),
    };
    TestServer::new(api::app(state)).unwrap()
}

fn server() -> TestServer {
    server_with(
        ScriptedFactory::replying(vec![&recommendations_reply(2)]),
        ResearchConfig::default(),
    )
}

#[tokio::test]
async fn health_reports_version() {
    let response = server().get("/health").await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn research_returns_json_recommendations() {
    let response = server()
        .post("/api/research")
        .json(&json!({
            "language": "Python",
            "topic": "FastAPI background task queue with Redis",
            "response_format": "json"
        }))
        .await;

    response.assert_status_ok();
    assert_eq!(
        response.header("content-type").to_str().unwrap(),
        "application/json"
    );
    let set: RecommendationSet = response.json();
    assert_eq!(set.recommendations.len(), 2);
    assert_eq!(set.query.language.as_deref(), Some("Python"));
}

#[tokio::test]
async fn research_defaults_to_markdown() {
    let response = server()
        .post("/api/research")
        .json(&json!({ "topic": "FastAPI background task queue with Redis" }))
        .await;

    response.assert_status_ok();
    assert!(response
        .header("content-type")
        .to_str()
        .unwrap()
        .starts_with("text/markdown"));
    assert!(response.text().starts_with("# Community Research:"));
}

#[tokio::test]
async fn vague_topic_is_bad_request_with_action() {
    let response = server()
        .post("/api/research")
        .json(&json!({ "topic": "performance" }))
        .await;

    response.assert_status_bad_request();
    let body: serde_json::Value = response.json();
    assert_eq!(body["kind"], "invalid_query");
    assert!(body["action"].as_str().unwrap().len() > 10);
}

#[tokio::test]
async fn exhausted_budget_is_429_with_retry_after() {
    let mut config = ResearchConfig::default();
    config.rate_limit.max_requests = 1;
    let server = server_with(
        ScriptedFactory::replying(vec![&recommendations_reply(1)]),
        config,
    );

    server
        .post("/api/research")
        .json(&json!({ "topic": "FastAPI background task queue with Redis" }))
        .await
        .assert_status_ok();

    let response = server
        .post("/api/research")
        .json(&json!({ "topic": "Django Celery beat schedule drift" }))
        .await;

    response.assert_status(axum::http::StatusCode::TOO_MANY_REQUESTS);
    assert!(response.maybe_header("retry-after").is_some());
    let body: serde_json::Value = response.json();
    assert_eq!(body["kind"], "rate_limited");
}

#[tokio::test]
async fn synthesis_failure_is_bad_gateway() {
    let response = server_with(
        ScriptedFactory::failing("backend returned HTTP 500"),
        ResearchConfig::default(),
    )
    .post("/api/research")
    .json(&json!({ "topic": "FastAPI background task queue with Redis" }))
    .await;

    response.assert_status(axum::http::StatusCode::BAD_GATEWAY);
    let body: serde_json::Value = response.json();
    assert_eq!(body["kind"], "synthesis_failure");
}

#[tokio::test]
async fn context_lists_providers_and_budget() {
    let response = server().get("/api/context").await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert_eq!(body["available_providers"]["configured"], "gemini");
    assert_eq!(body["active_sources"], json!(["stack_exchange_like"]));
    assert_eq!(body["rate_limit"]["remaining"], 10);
}

#[tokio::test]
async fn openapi_document_lists_research_path() {
    let response = server().get("/api/openapi.json").await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert!(body["paths"]["/api/research"]["post"].is_object());
    assert!(body["paths"]["/api/context"]["get"].is_object());
}
