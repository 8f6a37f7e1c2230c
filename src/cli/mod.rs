//! CLI module for community-research
//!
//! Parses the `community-research` command line with clap. The binary runs
//! as an MCP stdio server by default; the other subcommands start the HTTP
//! API, answer a single query, or inspect configuration.

pub mod output;

use crate::types::ResponseFormat;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// community-research - evidence-backed answers from developer communities
///
/// Searches Stack Overflow, GitHub issues, Reddit and Hacker News
/// concurrently and synthesizes ranked recommendations with an LLM.
#[derive(Parser, Debug)]
#[command(
    name = "community-research",
    author = "Dirmacs <build@dirmacs.com>",
    version,
    about = "Community-sourced technical research",
    long_about = "Searches Stack Overflow, GitHub issues, Reddit and Hacker News concurrently\n\
                  and synthesizes ranked, evidence-backed recommendations with a pluggable\n\
                  LLM backend.\n\n\
                  Run without arguments to serve MCP over stdio.",
    after_help = "EXAMPLES:\n    \
                  community-research                                   # MCP server on stdio\n    \
                  community-research serve --port 8080                 # HTTP API\n    \
                  community-research research \"FastAPI background tasks with Celery\" -l Python\n    \
                  community-research context                           # Workspace and provider info\n    \
                  community-research config --validate                 # Check research.toml"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "research.toml", global = true)]
    pub config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the research tools over MCP stdio (default)
    Mcp,

    /// Start the HTTP API
    Serve {
        /// Host address, overrides the config file
        #[arg(long)]
        host: Option<String>,

        /// Port, overrides the config file
        #[arg(long)]
        port: Option<u16>,
    },

    /// Research a single topic and print the result
    Research {
        /// Specific technical topic, e.g. "FastAPI background task queue with Redis"
        topic: String,

        /// Programming language
        #[arg(short, long)]
        language: Option<String>,

        /// What you want to achieve
        #[arg(short, long)]
        goal: Option<String>,

        /// What you are using today
        #[arg(short, long)]
        setup: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = FormatArg::Markdown)]
        format: FormatArg,
    },

    /// Show workspace, provider, rate-limit and cache context
    Context {
        /// Directory to scan (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Show configuration information
    Config {
        /// Validate the configuration file and exit
        #[arg(long)]
        validate: bool,
    },
}

/// `--format` values
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Markdown,
    Json,
}

impl From<FormatArg> for ResponseFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Markdown => ResponseFormat::Markdown,
            FormatArg::Json => ResponseFormat::Json,
        }
    }
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
