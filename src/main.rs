//! community-research entry point
//!
//! - `community-research` / `community-research mcp` - MCP server on stdio
//! - `community-research serve` - HTTP API
//! - `community-research research <topic>` - one-shot query
//! - `community-research context [path]` - workspace and provider snapshot
//! - `community-research config` - show or validate configuration

use anyhow::Context;
use community_research::{
    AppState, Orchestrator, ResearchConfig, ServerContext,
    api,
    cli::{Cli, Commands, output::Output},
    research::render::render_recommendations,
    types::{AppError, ResearchRequest},
};
use owo_colors::OwoColorize;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse_args();
    let output = if cli.no_color { Output::no_color() } else { Output::new() };

    let config = ResearchConfig::load_or_default(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;

    init_tracing(&config, cli.verbose, cli.log_json);

    match cli.command.unwrap_or(Commands::Mcp) {
        Commands::Mcp => serve_mcp(config).await,
        Commands::Serve { host, port } => serve_http(config, host, port, &output).await,
        Commands::Research {
            topic,
            language,
            goal,
            setup,
            format,
        } => {
            let orchestrator = Orchestrator::from_config(&config)?;
            let (query, format) = ResearchRequest {
                language,
                topic,
                goal,
                current_setup: setup,
                response_format: format.into(),
            }
            .into_query();

            match orchestrator.research(query).await {
                Ok(set) => {
                    println!(
                        "{}",
                        render_recommendations(&set, format, config.output.character_limit)
                    );
                    Ok(())
                }
                Err(err) => {
                    output.app_error(&err);
                    std::process::exit(exit_code(&err));
                }
            }
        }
        Commands::Context { path } => {
            let orchestrator = Orchestrator::from_config(&config)?;
            let context = ServerContext::collect(&orchestrator, &path);
            output.server_context(&context);
            Ok(())
        }
        Commands::Config { validate } => {
            if validate {
                ResearchConfig::load(&cli.config)
                    .with_context(|| format!("{} is invalid", cli.config.display()))?;
                output.success(&format!("{} is valid", cli.config.display()));
                return Ok(());
            }
            let rendered = toml::to_string_pretty(&config).context("failed to render config")?;
            println!("{}", rendered);
            Ok(())
        }
    }
}

fn init_tracing(config: &ResearchConfig, verbose: bool, json: bool) {
    let default_level = if verbose {
        "debug"
    } else {
        config.server.log_level.as_str()
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("community_research={}", default_level)));

    // stdout belongs to MCP and research output
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[cfg(feature = "mcp")]
async fn serve_mcp(config: ResearchConfig) -> anyhow::Result<()> {
    let orchestrator = Arc::new(Orchestrator::from_config(&config)?);
    if orchestrator.selected_provider().is_none() {
        tracing::warn!("No synthesis provider configured; community_search will fail until one is");
    }
    tracing::info!("Serving MCP on stdio");
    community_research::mcp::start_stdio_server(orchestrator, &config).await?;
    Ok(())
}

#[cfg(not(feature = "mcp"))]
async fn serve_mcp(_config: ResearchConfig) -> anyhow::Result<()> {
    anyhow::bail!("this build has no MCP support; rebuild with --features mcp or use `serve`")
}

async fn serve_http(
    mut config: ResearchConfig,
    host: Option<String>,
    port: Option<u16>,
    output: &Output,
) -> anyhow::Result<()> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let orchestrator = Arc::new(Orchestrator::from_config(&config)?);
    match orchestrator.selected_provider() {
        Some(provider) => output.info(&format!("synthesis provider: {}", provider.name)),
        None => output.warning("no synthesis provider configured; /api/research will return 503"),
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState {
        orchestrator,
        config: Arc::new(config),
    };

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    output.banner();
    output.success(&format!("listening on http://{}", addr));
    tracing::info!(%addr, "HTTP server started");

    axum::serve(listener, api::app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

fn exit_code(err: &AppError) -> i32 {
    match err {
        AppError::InvalidQuery { .. } => 2,
        AppError::RateLimited { .. } => 3,
        AppError::NoResultsFound { .. } => 4,
        _ => 1,
    }
}
