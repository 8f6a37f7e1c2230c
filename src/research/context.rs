//! Server context snapshot
//!
//! `get_server_context` tells a caller what the server can do before it asks
//! anything: which languages and frameworks the working directory uses,
//! which synthesis backends are configured, and how much rate-limit budget
//! is left. Building the snapshot never consumes budget.

use super::orchestrator::Orchestrator;
use crate::cache::CacheStats;
use crate::llm::KNOWN_BACKENDS;
use crate::rate_limit::RateLimitStatus;
use crate::types::{ProviderDescriptor, SourceKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use utoipa::ToSchema;
use walkdir::{DirEntry, WalkDir};

/// Files scanned before workspace detection gives up
pub const MAX_SCANNED_FILES: usize = 100;

const IGNORED_DIRS: &[&str] = &[
    ".git",
    "node_modules",
    "__pycache__",
    "venv",
    ".venv",
    "dist",
    "build",
    "target",
];

const CONFIG_FILES: &[&str] = &[
    "package.json",
    "requirements.txt",
    "pyproject.toml",
    "Cargo.toml",
    "go.mod",
    "pom.xml",
];

fn language_for_extension(ext: &str) -> Option<&'static str> {
    match ext {
        "py" => Some("Python"),
        "js" | "jsx" | "mjs" => Some("JavaScript"),
        "ts" | "tsx" => Some("TypeScript"),
        "java" => Some("Java"),
        "cpp" | "cc" | "cxx" | "hpp" => Some("C++"),
        "cs" => Some("C#"),
        "go" => Some("Go"),
        "rs" => Some("Rust"),
        "rb" => Some("Ruby"),
        "php" => Some("PHP"),
        "swift" => Some("Swift"),
        "kt" | "kts" => Some("Kotlin"),
        _ => None,
    }
}

fn framework_for_marker(file_name: &str) -> Option<&'static str> {
    match file_name {
        "manage.py" => Some("Django"),
        "angular.json" => Some("Angular"),
        "vue.config.js" => Some("Vue"),
        "next.config.js" | "next.config.mjs" | "next.config.ts" => Some("Next.js"),
        _ => None,
    }
}

/// Dependencies named inside a manifest that identify a framework
fn frameworks_in_manifest(file_name: &str, content: &str) -> Vec<&'static str> {
    let needles: &[(&str, &str)] = match file_name {
        "package.json" => &[
            ("\"react\"", "React"),
            ("\"vue\"", "Vue"),
            ("\"@angular/core\"", "Angular"),
            ("\"next\"", "Next.js"),
            ("\"express\"", "Express"),
        ],
        "requirements.txt" | "pyproject.toml" => &[
            ("django", "Django"),
            ("fastapi", "FastAPI"),
            ("flask", "Flask"),
        ],
        "Cargo.toml" => &[
            ("axum", "Axum"),
            ("actix-web", "Actix Web"),
            ("rocket", "Rocket"),
            ("tokio", "Tokio"),
        ],
        _ => &[],
    };

    let haystack = content.to_lowercase();
    needles
        .iter()
        .filter(|(needle, _)| haystack.contains(needle))
        .map(|(_, framework)| *framework)
        .collect()
}

/// What a bounded scan of a directory tree found
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct WorkspaceContext {
    pub workspace: String,
    pub languages: BTreeSet<String>,
    pub frameworks: BTreeSet<String>,
    pub config_files: Vec<String>,
    /// True when the scan stopped at [`MAX_SCANNED_FILES`]
    pub scan_limited: bool,
}

impl WorkspaceContext {
    /// Scan `root`, visiting at most [`MAX_SCANNED_FILES`] files
    pub fn detect(root: &Path) -> Self {
        let mut context = WorkspaceContext {
            workspace: root.display().to_string(),
            ..Default::default()
        };
        let mut scanned = 0usize;

        let walker = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !is_ignored_dir(e));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::debug!(error = %err, "Skipping unreadable workspace entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            if scanned >= MAX_SCANNED_FILES {
                context.scan_limited = true;
                break;
            }
            scanned += 1;
            context.inspect(entry.path());
        }

        context
    }

    fn inspect(&mut self, path: &Path) {
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            return;
        };

        if let Some(language) = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(language_for_extension)
        {
            self.languages.insert(language.to_string());
        }

        if let Some(framework) = framework_for_marker(file_name) {
            self.frameworks.insert(framework.to_string());
        }

        if CONFIG_FILES.contains(&file_name) {
            self.config_files.push(file_name.to_string());
            if let Ok(content) = fs::read_to_string(path) {
                for framework in frameworks_in_manifest(file_name, &content) {
                    self.frameworks.insert(framework.to_string());
                }
            }
        }
    }
}

fn is_ignored_dir(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| IGNORED_DIRS.contains(&name))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Capabilities {
    pub multi_source_search: bool,
    pub query_validation: bool,
    pub llm_synthesis: bool,
    pub caching: bool,
    pub rate_limiting: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Handshake {
    pub server: String,
    pub version: String,
    pub status: String,
    pub description: String,
    pub capabilities: Capabilities,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ContextDefaults {
    /// First detected language, used when a query names none
    pub language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ProviderSummary {
    /// Backend `research` will use, if any
    pub configured: Option<String>,
    pub supported: Vec<String>,
    /// Every known backend in priority order
    pub descriptors: Vec<ProviderDescriptor>,
}

/// Read-only snapshot returned by `get_server_context`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ServerContext {
    pub handshake: Handshake,
    pub project_context: WorkspaceContext,
    pub context_defaults: ContextDefaults,
    pub available_providers: ProviderSummary,
    pub active_sources: Vec<SourceKind>,
    pub rate_limit: RateLimitStatus,
    pub cache: CacheStats,
}

impl ServerContext {
    /// Build a snapshot for `workspace`
    pub fn collect(orchestrator: &Orchestrator, workspace: &Path) -> Self {
        let project_context = WorkspaceContext::detect(workspace);
        let selected = orchestrator.selected_provider();

        ServerContext {
            handshake: Handshake {
                server: env!("CARGO_PKG_NAME").to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                status: "initialized".to_string(),
                description: "Searches Stack Overflow, GitHub issues, Reddit and Hacker News \
                              for real-world solutions and synthesizes recommendations"
                    .to_string(),
                capabilities: Capabilities {
                    multi_source_search: true,
                    query_validation: true,
                    llm_synthesis: selected.is_some(),
                    caching: true,
                    rate_limiting: true,
                },
            },
            context_defaults: ContextDefaults {
                language: project_context.languages.iter().next().cloned(),
            },
            project_context,
            available_providers: ProviderSummary {
                configured: selected.map(|d| d.name),
                supported: KNOWN_BACKENDS.iter().map(|b| b.name.to_string()).collect(),
                descriptors: orchestrator.providers().to_vec(),
            },
            active_sources: orchestrator.active_sources(),
            rate_limit: orchestrator.rate_limit_status(),
            cache: orchestrator.cache_stats(),
        }
    }

    /// Snapshot for the process working directory
    pub fn collect_for_cwd(orchestrator: &Orchestrator) -> Self {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::collect(orchestrator, &cwd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_detects_languages_frameworks_and_configs() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "app/main.py", "print('hi')");
        touch(dir.path(), "requirements.txt", "fastapi==0.110\ncelery\n");
        touch(dir.path(), "web/index.tsx", "export {}");
        touch(dir.path(), "web/package.json", r#"{"dependencies": {"react": "18"}}"#);
        touch(dir.path(), "manage.py", "");

        let context = WorkspaceContext::detect(dir.path());

        assert!(context.languages.contains("Python"));
        assert!(context.languages.contains("TypeScript"));
        assert!(context.frameworks.contains("FastAPI"));
        assert!(context.frameworks.contains("React"));
        assert!(context.frameworks.contains("Django"));
        assert!(context.config_files.contains(&"requirements.txt".to_string()));
        assert!(!context.scan_limited);
    }

    #[test]
    fn test_skips_ignored_directories() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "node_modules/lib/index.js", "");
        touch(dir.path(), "target/debug/build.rs", "");
        touch(dir.path(), "src/lib.go", "package lib");

        let context = WorkspaceContext::detect(dir.path());
        assert_eq!(
            context.languages.into_iter().collect::<Vec<_>>(),
            vec!["Go".to_string()]
        );
    }

    #[test]
    fn test_scan_is_bounded() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..(MAX_SCANNED_FILES + 5) {
            touch(dir.path(), &format!("f{:03}.rb", i), "");
        }

        let context = WorkspaceContext::detect(dir.path());
        assert!(context.scan_limited);
        assert!(context.languages.contains("Ruby"));
    }
}
