use crate::research::ServerContext;
use crate::research::orchestrator::Orchestrator;
use crate::research::render::{render_error, render_recommendations};
use crate::types::{AppError, ResearchRequest, ResponseFormat};
use crate::utils::toml_config::ResearchConfig;
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{tool::ToolRouter, wrapper::Parameters},
    model::*,
    tool, tool_handler, tool_router,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Parameters for `community_search`
#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct CommunitySearchParams {
    /// Programming language, e.g. "Python" or "Rust"
    pub language: Option<String>,
    /// Specific technical topic. Name the technology and the problem, e.g.
    /// "FastAPI background task queue with Redis" rather than "performance"
    pub topic: String,
    /// What you want to achieve
    pub goal: Option<String>,
    /// What you are using today
    pub current_setup: Option<String>,
    /// Output format, markdown when omitted
    pub response_format: Option<ResponseFormat>,
}

impl From<CommunitySearchParams> for ResearchRequest {
    fn from(params: CommunitySearchParams) -> Self {
        ResearchRequest {
            language: params.language,
            topic: params.topic,
            goal: params.goal,
            current_setup: params.current_setup,
            response_format: params.response_format.unwrap_or_default(),
        }
    }
}

/// MCP server exposing community research tools
#[derive(Clone)]
pub struct CommunityResearchServer {
    orchestrator: Arc<Orchestrator>,
    character_limit: usize,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl CommunityResearchServer {
    pub fn new(orchestrator: Arc<Orchestrator>, character_limit: usize) -> Self {
        Self {
            orchestrator,
            character_limit,
            tool_router: Self::tool_router(),
        }
    }

    #[tool(
        description = "Search Stack Overflow, GitHub issues, Reddit and Hacker News for \
                       real-world solutions to a specific technical problem and return \
                       ranked, evidence-backed recommendations"
    )]
    async fn community_search(
        &self,
        params: Parameters<CommunitySearchParams>,
    ) -> Result<CallToolResult, McpError> {
        let (query, format) = ResearchRequest::from(params.0).into_query();

        match self.orchestrator.research(query).await {
            Ok(set) => Ok(CallToolResult::success(vec![Content::text(
                render_recommendations(&set, format, self.character_limit),
            )])),
            Err(err) => Ok(CallToolResult::error(vec![Content::text(render_error(
                &err, format,
            ))])),
        }
    }

    #[tool(
        description = "Describe this server: detected workspace languages and frameworks, \
                       configured synthesis providers, active sources, remaining rate-limit \
                       budget and cache statistics"
    )]
    async fn get_server_context(&self) -> Result<CallToolResult, McpError> {
        let orchestrator = self.orchestrator.clone();
        let context =
            tokio::task::spawn_blocking(move || ServerContext::collect_for_cwd(&orchestrator))
                .await
                .map_err(|e| AppError::Internal(format!("workspace scan failed: {}", e)));

        let rendered = context.and_then(|context| {
            serde_json::to_string_pretty(&context)
                .map_err(|e| AppError::Internal(format!("failed to encode context: {}", e)))
        });

        match rendered {
            Ok(json) => Ok(CallToolResult::success(vec![Content::text(json)])),
            Err(err) => Ok(CallToolResult::error(vec![Content::text(render_error(
                &err,
                ResponseFormat::Json,
            ))])),
        }
    }
}

#[tool_handler]
impl ServerHandler for CommunityResearchServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::default(),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: env!("CARGO_PKG_NAME").into(),
                version: env!("CARGO_PKG_VERSION").into(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Call get_server_context first to learn the workspace language and which \
                 providers are configured, then call community_search with a specific topic."
                    .into(),
            ),
        }
    }
}

/// Serve MCP over stdio until the client disconnects
pub async fn start_stdio_server(
    orchestrator: Arc<Orchestrator>,
    config: &ResearchConfig,
) -> crate::types::Result<()> {
    use rmcp::{ServiceExt, transport::io::stdio};

    let server = CommunityResearchServer::new(orchestrator, config.output.character_limit);

    let running = server
        .serve(stdio())
        .await
        .map_err(|e| AppError::Internal(format!("MCP server error: {}", e)))?;

    running
        .waiting()
        .await
        .map_err(|e| AppError::Internal(format!("MCP server error: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ProviderRegistry;
    use crate::research::orchestrator::Components;

    fn server() -> CommunityResearchServer {
        let config = ResearchConfig::default();
        let orchestrator = Orchestrator::new(
            &config,
            Components {
                sources: vec![],
                providers: Arc::new(ProviderRegistry::from_descriptors(vec![])),
                llm_factory: Arc::new(ProviderRegistry::from_descriptors(vec![])),
            },
        );
        CommunityResearchServer::new(Arc::new(orchestrator), 25_000)
    }

    fn text_of(result: &CallToolResult) -> String {
        let value = serde_json::to_value(result).unwrap();
        value["content"][0]["text"].as_str().unwrap().to_string()
    }

    fn params(topic: &str, format: Option<ResponseFormat>) -> Parameters<CommunitySearchParams> {
        Parameters(CommunitySearchParams {
            language: None,
            topic: topic.to_string(),
            goal: None,
            current_setup: None,
            response_format: format,
        })
    }

    #[tokio::test]
    async fn test_vague_topic_is_reported_as_tool_error() {
        let result = server()
            .community_search(params("performance", Some(ResponseFormat::Json)))
            .await
            .unwrap();

        assert_eq!(result.is_error, Some(true));
        let body: serde_json::Value = serde_json::from_str(&text_of(&result)).unwrap();
        assert_eq!(body["kind"], "invalid_query");
    }

    #[test]
    fn test_response_format_is_a_closed_enum() {
        let schema = serde_json::to_string(&schemars::schema_for!(CommunitySearchParams)).unwrap();
        assert!(schema.contains("\"markdown\""));
        assert!(schema.contains("\"json\""));

        let parsed: CommunitySearchParams = serde_json::from_value(serde_json::json!({
            "topic": "tokio select cancellation safety",
            "response_format": "json"
        }))
        .unwrap();
        assert_eq!(parsed.response_format, Some(ResponseFormat::Json));

        let unknown = serde_json::from_value::<CommunitySearchParams>(serde_json::json!({
            "topic": "tokio select cancellation safety",
            "response_format": "yaml"
        }));
        assert!(unknown.is_err());
    }

    #[tokio::test]
    async fn test_markdown_error_by_default() {
        let result = server()
            .community_search(params("tokio select cancellation safety", None))
            .await
            .unwrap();
        assert!(text_of(&result).starts_with("# Research Failed"));
    }

    #[test]
    fn test_info_advertises_tools() {
        let info = server().get_info();
        assert!(info.capabilities.tools.is_some());
        assert_eq!(info.server_info.name, "community-research");
    }
}
