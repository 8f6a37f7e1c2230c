//! Query specificity gate
//!
//! Rejects under-specified queries before any network cost is incurred.
//! Vague topics burn rate-limit budget and give the synthesis backend
//! nothing concrete to work with, so they are turned away with a
//! reformulation hint instead.

use crate::types::{Query, ValidationResult};
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

/// Topics with fewer whitespace-separated tokens are rejected outright
pub const MIN_TOPIC_TOKENS: usize = 2;
/// Meaningful words that make a topic specific on their own
pub const SPECIFIC_WORD_COUNT: usize = 4;
pub const MAX_TOPIC_CHARS: usize = 500;
pub const MAX_GOAL_CHARS: usize = 500;
pub const MAX_SETUP_CHARS: usize = 1000;
pub const LANGUAGE_CHARS: std::ops::RangeInclusive<usize> = 2..=50;

const GENERIC_TERMS: &[&str] = &[
    "settings",
    "setting",
    "configuration",
    "config",
    "setup",
    "performance",
    "optimization",
    "optimisation",
    "optimize",
    "tutorial",
    "basics",
    "help",
    "issue",
    "issues",
    "problem",
    "problems",
    "error",
    "errors",
    "debugging",
    "debug",
    "install",
    "installation",
    "tips",
    "guide",
    "example",
    "examples",
    "code",
    "fix",
    "best",
    "practices",
    "practice",
    "getting",
    "started",
    "speed",
    "fast",
    "faster",
    "slow",
    "improve",
    "better",
    "good",
    "way",
    "stuff",
    "things",
];

const STOPWORDS: &[&str] = &[
    "a", "an", "the", "and", "or", "of", "for", "to", "in", "on", "with", "my", "our", "is",
    "are", "how", "what", "why", "do", "does", "i", "we", "it", "this", "that", "at", "by",
    "from", "into", "using", "use", "vs", "via", "can", "should", "when",
];

const KNOWN_TECHNOLOGIES: &[&str] = &[
    // languages
    "python", "javascript", "typescript", "java", "kotlin", "swift", "rust", "golang",
    "ruby", "php", "c++", "cpp", "c#", "csharp", "scala", "elixir", "haskell", "lua",
    "dart", "sql", "bash", "zig",
    // web frameworks and runtimes
    "fastapi", "django", "flask", "express", "react", "vue", "angular", "svelte", "nextjs",
    "next.js", "node", "nodejs", "node.js", "deno", "bun", "rails", "laravel", "spring",
    "axum", "actix", "tokio", "asyncio", "celery", "graphql", "grpc", "websocket",
    "websockets", "htmx", "tailwind", "webpack", "vite",
    // data and infra
    "redis", "postgres", "postgresql", "mysql", "sqlite", "mongodb", "kafka", "rabbitmq",
    "elasticsearch", "docker", "kubernetes", "k8s", "terraform", "ansible", "nginx", "aws",
    "gcp", "azure", "lambda", "s3", "sqlalchemy", "prisma", "pandas", "numpy", "pytorch",
    "tensorflow", "opencv", "git", "github", "oauth", "jwt", "wasm", "webassembly", "llvm",
    "linux", "windows", "macos", "android", "ios", "electron", "tauri", "qt", "gtk", "unity",
    "pydantic", "serde", "yup", "zod", "jest", "pytest", "cargo", "npm", "pip", "poetry",
    "vscode", "neovim", "http", "https", "tls", "ssl", "tcp", "udp", "json", "yaml", "toml",
    "csv", "regex", "cuda",
];

/// Technology names that are also plain English. Each only counts when the
/// language field names it or a neighbouring word belongs to its ecosystem.
const AMBIGUOUS_TECHNOLOGIES: &[(&str, &[&str], &[&str])] = &[
    (
        "go",
        &["go", "golang"],
        &[
            "module", "modules", "goroutine", "goroutines", "channel", "channels", "generics",
            "struct", "structs", "interface", "interfaces", "gin", "toolchain", "compiler",
        ],
    ),
    (
        "c",
        &["c"],
        &[
            "pointer", "pointers", "struct", "structs", "malloc", "header", "headers", "macro",
            "macros", "gcc", "clang", "compiler", "makefile",
        ],
    ),
];

const GENERIC_PHRASES: &[&str] = &[
    "best practices",
    "how to",
    "getting started",
    "help me",
    "doesn't work",
    "not working",
];

const SUGGESTION: &str = "Add the specific library or tool and what you are trying to \
    accomplish, e.g. 'FastAPI background task queue with Redis' or \
    'reduce Docker image size with multi-stage builds'.";

static VERSION_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(v?\d+(\.\d+)+[a-z0-9-]*|v\d+|[a-z]+\d{2,}[a-z0-9]*)$")
        .expect("version pattern is valid")
});

static IDENTIFIER_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    // dotted names, paths, snake_case, camelCase, and PascalCase with an inner capital
    Regex::new(r"^([A-Za-z_][\w-]*(\.|::|/)[\w.:/-]+|[a-z0-9]+_[a-z0-9_]+|[a-z][a-z0-9]*[A-Z][A-Za-z0-9]*|[A-Z][a-z0-9]+[A-Z][A-Za-z0-9]*)$")
        .expect("identifier pattern is valid")
});

static GENERIC: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| GENERIC_TERMS.iter().copied().collect());
static STOP: LazyLock<HashSet<&'static str>> = LazyLock::new(|| STOPWORDS.iter().copied().collect());
static TECH: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| KNOWN_TECHNOLOGIES.iter().copied().collect());

/// Pure specificity check over a [`Query`]
#[derive(Debug, Clone, Default)]
pub struct QueryValidator;

impl QueryValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate(&self, query: &Query) -> ValidationResult {
        let topic = query.topic.trim();

        if topic.is_empty() {
            return ValidationResult::reject("Topic is empty.", SUGGESTION);
        }

        if topic.chars().count() > MAX_TOPIC_CHARS {
            return ValidationResult::reject(
                format!("Topic is longer than {} characters.", MAX_TOPIC_CHARS),
                "Summarize the problem in one sentence and move details into 'current_setup'.",
            );
        }

        if let Some(rejection) = check_field_lengths(query) {
            return rejection;
        }

        let raw_tokens: Vec<&str> = topic.split_whitespace().collect();
        if raw_tokens.len() < MIN_TOPIC_TOKENS {
            return ValidationResult::reject(
                format!(
                    "Topic '{}' is too short: use at least {} words.",
                    topic, MIN_TOPIC_TOKENS
                ),
                SUGGESTION,
            );
        }

        let tokens: Vec<String> = raw_tokens.iter().map(|t| normalize_token(t)).collect();
        let meaningful: Vec<&str> = tokens
            .iter()
            .map(String::as_str)
            .filter(|t| !t.is_empty() && !STOP.contains(t))
            .collect();

        let language = query.language_hint().map(str::to_lowercase);
        let has_signal = (0..tokens.len())
            .any(|i| is_signal(&raw_tokens, &tokens, i, language.as_deref()));

        let lowered = topic.to_lowercase();
        let only_generic = meaningful.iter().all(|t| is_generic_word(t));
        if !has_signal && (meaningful.is_empty() || only_generic || is_generic_phrase(&lowered)) {
            return ValidationResult::reject(
                format!(
                    "Topic '{}' is too vague: it only contains generic terms.",
                    topic
                ),
                SUGGESTION,
            );
        }

        if !has_signal && meaningful.len() < SPECIFIC_WORD_COUNT {
            return ValidationResult::reject(
                format!(
                    "Topic '{}' does not name a technology, library or version.",
                    topic
                ),
                SUGGESTION,
            );
        }

        ValidationResult::accept()
    }
}

fn check_field_lengths(query: &Query) -> Option<ValidationResult> {
    if let Some(language) = query.language.as_deref() {
        let len = language.trim().chars().count();
        if len > 0 && !LANGUAGE_CHARS.contains(&len) {
            return Some(ValidationResult::reject(
                format!(
                    "Language must be between {} and {} characters.",
                    LANGUAGE_CHARS.start(),
                    LANGUAGE_CHARS.end()
                ),
                "Use the plain language name, e.g. 'Python', 'TypeScript' or 'Rust'.",
            ));
        }
    }

    if query
        .goal
        .as_deref()
        .is_some_and(|g| g.chars().count() > MAX_GOAL_CHARS)
    {
        return Some(ValidationResult::reject(
            format!("Goal is longer than {} characters.", MAX_GOAL_CHARS),
            "State the outcome you want in one sentence.",
        ));
    }

    if query
        .current_setup
        .as_deref()
        .is_some_and(|s| s.chars().count() > MAX_SETUP_CHARS)
    {
        return Some(ValidationResult::reject(
            format!("Current setup is longer than {} characters.", MAX_SETUP_CHARS),
            "List only the frameworks and services involved.",
        ));
    }

    None
}

fn is_signal(raw: &[&str], tokens: &[String], i: usize, language: Option<&str>) -> bool {
    let token = tokens[i].as_str();

    if let Some((_, languages, companions)) = AMBIGUOUS_TECHNOLOGIES
        .iter()
        .find(|(name, _, _)| *name == token)
    {
        let named_by_language = language.is_some_and(|l| languages.contains(&l));
        let neighbours = [i.checked_sub(1), Some(i + 1)];
        let backed_by_neighbour = neighbours
            .into_iter()
            .flatten()
            .filter_map(|j| tokens.get(j))
            .any(|t| companions.contains(&t.as_str()));
        return named_by_language || backed_by_neighbour;
    }

    TECH.contains(token)
        || VERSION_TOKEN.is_match(token)
        || is_identifier_signal(strip_punctuation(raw[i]))
}

/// Identifier-shaped tokens count only when some part of them is not generic,
/// so `settings/configuration` or `best_practices` stay vague
fn is_identifier_signal(raw: &str) -> bool {
    IDENTIFIER_TOKEN.is_match(raw) && !is_generic_word(&raw.to_lowercase())
}

/// True when every part of a (possibly `/`, `.`, `::`, `_` or `-` joined)
/// word is a generic term or a stopword
fn is_generic_word(word: &str) -> bool {
    let mut parts = word
        .split(|c: char| matches!(c, '/' | '.' | ':' | '_' | '-'))
        .filter(|p| !p.is_empty())
        .peekable();
    parts.peek().is_some()
        && parts.all(|p| GENERIC.contains(p) || STOP.contains(p))
}

/// A topic whose meaningful content is nothing but a generic phrase
fn is_generic_phrase(lowered: &str) -> bool {
    GENERIC_PHRASES.iter().any(|phrase| {
        let rest = lowered.replace(phrase, " ");
        rest.split_whitespace()
            .map(normalize_token)
            .all(|t| t.is_empty() || STOP.contains(t.as_str()) || is_generic_word(&t))
    })
}

fn strip_punctuation(token: &str) -> &str {
    token.trim_matches(|c: char| matches!(c, ',' | ';' | ':' | '(' | ')' | '"' | '\'' | '?' | '!' | '[' | ']'))
        .trim_end_matches('.')
}

fn normalize_token(token: &str) -> String {
    strip_punctuation(token).to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn validate(topic: &str) -> ValidationResult {
        QueryValidator::new().validate(&Query::new(topic))
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("performance")]
    #[case("settings")]
    #[case("FastAPI")]
    #[case("best practices")]
    #[case("configuration help")]
    #[case("how to")]
    #[case("performance optimization tips")]
    #[case("getting started")]
    #[case("BEST PRACTICES")]
    #[case("PERFORMANCE TIPS")]
    #[case("HELP ME")]
    #[case("settings/configuration help")]
    #[case("best_practices for errors")]
    #[case("how to go faster")]
    #[case("c code tips")]
    fn test_rejects_vague_topics(#[case] topic: &str) {
        let result = validate(topic);
        assert!(!result.accepted, "expected rejection for {:?}", topic);
        assert!(result.reason.as_deref().is_some_and(|r| !r.is_empty()));
        assert!(result.suggestion.as_deref().is_some_and(|s| !s.is_empty()));
    }

    #[rstest]
    #[case("FastAPI background task queue with Redis and Celery")]
    #[case("React custom hooks for form validation with Yup")]
    #[case("async/await patterns for HTTP clients with tokio")]
    #[case("Docker multi-stage builds to reduce image size")]
    #[case("Redis configuration")]
    #[case("upgrade to Python 3.12")]
    #[case("useEffect cleanup ordering")]
    #[case("std::sync::Mutex poisoning")]
    #[case("streaming large uploads without buffering everything in memory")]
    #[case("Go generics constraints")]
    #[case("C pointers arithmetic")]
    #[case("iOS keychain access")]
    fn test_accepts_specific_topics(#[case] topic: &str) {
        let result = validate(topic);
        assert!(result.accepted, "expected acceptance for {:?}: {:?}", topic, result);
        assert!(result.reason.is_none());
    }

    #[test]
    fn test_short_topic_without_signal_is_rejected() {
        let result = validate("queue workers");
        assert!(!result.accepted);
        assert!(result.reason.unwrap().contains("technology"));
    }

    #[test]
    fn test_long_topic_rejected() {
        let topic = "tokio ".repeat(120);
        let result = validate(&topic);
        assert!(!result.accepted);
        assert!(result.reason.unwrap().contains("500"));
    }

    #[test]
    fn test_field_lengths_checked() {
        let validator = QueryValidator::new();
        let query = Query::new("tokio select loop cancellation").with_language("R");
        assert!(!validator.validate(&query).accepted);

        let query = Query::new("tokio select loop cancellation").with_goal("x".repeat(501));
        assert!(!validator.validate(&query).accepted);

        let query =
            Query::new("tokio select loop cancellation").with_current_setup("y".repeat(1001));
        assert!(!validator.validate(&query).accepted);
    }

    #[test]
    fn test_into_result_maps_to_invalid_query() {
        let err = validate("settings").into_result().unwrap_err();
        match err {
            crate::types::AppError::InvalidQuery { suggestion, .. } => {
                assert!(suggestion.contains("library"))
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_version_and_identifier_tokens() {
        assert!(VERSION_TOKEN.is_match("3.11"));
        assert!(VERSION_TOKEN.is_match("v2"));
        assert!(VERSION_TOKEN.is_match("es2022"));
        assert!(!VERSION_TOKEN.is_match("queue"));
        assert!(IDENTIFIER_TOKEN.is_match("node.js"));
        assert!(IDENTIFIER_TOKEN.is_match("snake_case"));
        assert!(IDENTIFIER_TOKEN.is_match("useEffect"));
        assert!(!IDENTIFIER_TOKEN.is_match("queue"));
        assert!(!IDENTIFIER_TOKEN.is_match("Queue"));
        assert!(!IDENTIFIER_TOKEN.is_match("BEST"));
        assert!(!IDENTIFIER_TOKEN.is_match("PERFORMANCE"));
        assert!(IDENTIFIER_TOKEN.is_match("FastApi"));
    }

    #[test]
    fn test_generic_compounds_are_not_identifiers() {
        assert!(!is_identifier_signal("settings/configuration"));
        assert!(!is_identifier_signal("best_practices"));
        assert!(is_identifier_signal("async/await"));
        assert!(is_identifier_signal("std::sync::Mutex"));
    }

    #[test]
    fn test_ambiguous_language_names_need_backing() {
        let validator = QueryValidator::new();

        assert!(!validate("go faster builds").accepted);

        let query = Query::new("go faster builds").with_language("Go");
        assert!(validator.validate(&query).accepted);

        let query = Query::new("go faster builds").with_language("golang");
        assert!(validator.validate(&query).accepted);

        assert!(validate("go modules replace directive").accepted);
    }
}
