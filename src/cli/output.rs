//! Colored status output for the CLI
//!
//! Everything here goes to stderr. Stdout carries research results and,
//! under `mcp`, the protocol stream itself.

use crate::research::ServerContext;
use crate::types::AppError;
use owo_colors::OwoColorize;

/// Output style configuration
pub struct Output {
    /// Whether to use colored output
    pub colored: bool,
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

impl Output {
    pub fn new() -> Self {
        Self { colored: true }
    }

    pub fn no_color() -> Self {
        Self { colored: false }
    }

    pub fn banner(&self) {
        if self.colored {
            eprintln!(
                "\n  {} {}\n",
                "community-research".bright_cyan().bold(),
                format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
            );
        } else {
            eprintln!("\n  community-research v{}\n", env!("CARGO_PKG_VERSION"));
        }
    }

    pub fn success(&self, message: &str) {
        if self.colored {
            eprintln!("  {} {}", "✓".green().bold(), message.green());
        } else {
            eprintln!("  [OK] {}", message);
        }
    }

    pub fn info(&self, message: &str) {
        if self.colored {
            eprintln!("  {} {}", "•".blue(), message);
        } else {
            eprintln!("  [INFO] {}", message);
        }
    }

    pub fn warning(&self, message: &str) {
        if self.colored {
            eprintln!("  {} {}", "⚠".yellow().bold(), message.yellow());
        } else {
            eprintln!("  [WARN] {}", message);
        }
    }

    pub fn error(&self, message: &str) {
        if self.colored {
            eprintln!("  {} {}", "✗".red().bold(), message.red());
        } else {
            eprintln!("  [ERROR] {}", message);
        }
    }

    /// Print a research error with its corrective action
    pub fn app_error(&self, err: &AppError) {
        self.error(&err.to_string());
        if self.colored {
            eprintln!("    {} {}", "→".dimmed(), err.corrective_action().dimmed());
        } else {
            eprintln!("    -> {}", err.corrective_action());
        }
    }

    pub fn header(&self, title: &str) {
        if self.colored {
            eprintln!("\n  {}", title.bright_white().bold().underline());
        } else {
            eprintln!("\n  === {} ===", title);
        }
    }

    pub fn kv(&self, key: &str, value: &str) {
        if self.colored {
            eprintln!("    {}: {}", key.dimmed(), value.bright_white());
        } else {
            eprintln!("    {}: {}", key, value);
        }
    }

    pub fn list_item(&self, item: &str) {
        if self.colored {
            eprintln!("    {} {}", "•".blue(), item);
        } else {
            eprintln!("    - {}", item);
        }
    }

    pub fn hint(&self, message: &str) {
        if self.colored {
            eprintln!("\n  {}", message.dimmed().italic());
        } else {
            eprintln!("\n  [TIP] {}", message);
        }
    }

    /// Human-readable summary of a [`ServerContext`]
    pub fn server_context(&self, context: &ServerContext) {
        self.header("Workspace");
        self.kv("path", &context.project_context.workspace);
        self.kv("languages", &join_or_none(context.project_context.languages.iter()));
        self.kv("frameworks", &join_or_none(context.project_context.frameworks.iter()));
        if context.project_context.scan_limited {
            self.warning("workspace scan stopped early; results may be partial");
        }

        self.header("Providers");
        for descriptor in &context.available_providers.descriptors {
            let state = if descriptor.available { "available" } else { "not configured" };
            let line = format!("{} (priority {}): {}", descriptor.name, descriptor.priority, state);
            if Some(&descriptor.name) == context.available_providers.configured.as_ref() {
                self.success(&format!("{} [selected]", line));
            } else {
                self.list_item(&line);
            }
        }

        self.header("Sources");
        for source in &context.active_sources {
            self.list_item(source.display_name());
        }

        self.header("Limits");
        self.kv(
            "rate limit",
            &format!(
                "{}/{} used, {} remaining",
                context.rate_limit.used, context.rate_limit.limit, context.rate_limit.remaining
            ),
        );
        self.kv(
            "cache",
            &format!(
                "{} entries, {} hits, {} misses",
                context.cache.entry_count, context.cache.hits, context.cache.misses
            ),
        );
    }
}

fn join_or_none<'a>(items: impl Iterator<Item = &'a String>) -> String {
    let joined = items.map(String::as_str).collect::<Vec<_>>().join(", ");
    if joined.is_empty() {
        "none detected".to_string()
    } else {
        joined
    }
}
