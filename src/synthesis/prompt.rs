//! Prompt construction
//!
//! The prompt embeds the query fields and the evidence of every source that
//! answered, grouped by source. Evidence from failed sources is left out
//! entirely; their names are not mentioned either, so the model cannot
//! invent results for them.

use super::schema::{ParseFailure, RESPONSE_SCHEMA};
use crate::types::{AggregatedEvidence, Query};

pub const SYSTEM_PROMPT: &str = "You are a senior engineer summarizing what developer communities \
recommend. Base every recommendation strictly on the search results provided. Respond with a \
single JSON object matching the requested schema and nothing else: no prose, no markdown.";

/// Build the user prompt for a query and its evidence
pub fn build_prompt(query: &Query, evidence: &AggregatedEvidence) -> String {
    let mut prompt = String::with_capacity(4096);

    prompt.push_str("## Question\n");
    if let Some(language) = query.language_hint() {
        prompt.push_str(&format!("Language: {}\n", language));
    }
    prompt.push_str(&format!("Topic: {}\n", query.topic.trim()));
    if let Some(goal) = query.goal.as_deref().filter(|g| !g.trim().is_empty()) {
        prompt.push_str(&format!("Goal: {}\n", goal.trim()));
    }
    if let Some(setup) = query.current_setup.as_deref().filter(|s| !s.trim().is_empty()) {
        prompt.push_str(&format!("Current setup: {}\n", setup.trim()));
    }

    prompt.push_str("\n## Community evidence\n");
    for source in evidence.contributing() {
        prompt.push_str(&format!("\n### {}\n", source.source.display_name()));
        for (i, result) in source.results.iter().enumerate() {
            prompt.push_str(&format!(
                "{}. {} (score: {})\n   URL: {}\n",
                i + 1,
                result.title,
                result.score,
                result.url
            ));
            if !result.snippet.is_empty() {
                prompt.push_str(&format!("   {}\n", result.snippet));
            }
        }
    }

    prompt.push_str(&format!(
        "\n## Task\n\
         Produce between 1 and 5 recommendations, best first. Count `mentions` as the number of \
         results above that support a recommendation and `upvotes_or_stars` as the sum of their \
         scores. Include a code example only when the evidence shows one.\n\n\
         Respond with JSON exactly in this shape:\n{}\n",
        RESPONSE_SCHEMA
    ));

    prompt
}

/// Prompt for the single retry after unparseable output
pub fn build_retry_prompt(original: &str, failure: &ParseFailure) -> String {
    format!(
        "{}\n## Correction\nYour previous reply was rejected: {}. \
         Reply again with only the JSON object, using exactly the fields shown.\n",
        original, failure
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SearchResult, SourceEvidence, SourceKind, SourceStatus};
    use chrono::Utc;

    fn result(source: SourceKind, title: &str, score: i64) -> SearchResult {
        SearchResult {
            source,
            title: title.to_string(),
            url: format!("https://example.com/{}", score),
            score,
            snippet: "snippet text".to_string(),
            retrieved_at: Utc::now(),
        }
    }

    #[test]
    fn test_prompt_contains_query_and_grouped_evidence() {
        let query = Query::new("FastAPI background task queue")
            .with_language("Python")
            .with_goal("non-blocking email sending");
        let evidence = AggregatedEvidence {
            sources: vec![
                SourceEvidence::ok(
                    SourceKind::StackExchangeLike,
                    vec![result(SourceKind::StackExchangeLike, "Celery vs RQ", 42)],
                ),
                SourceEvidence::ok(
                    SourceKind::ForumLike,
                    vec![result(SourceKind::ForumLike, "I use arq", 7)],
                ),
            ],
        };

        let prompt = build_prompt(&query, &evidence);
        assert!(prompt.contains("Language: Python"));
        assert!(prompt.contains("Goal: non-blocking email sending"));
        assert!(prompt.contains("### Stack Overflow"));
        assert!(prompt.contains("1. Celery vs RQ (score: 42)"));
        assert!(prompt.contains("### Reddit"));
        assert!(prompt.contains("\"recommendations\""));
        assert!(!prompt.contains("Current setup"));

        let so = prompt.find("### Stack Overflow").unwrap();
        let reddit = prompt.find("### Reddit").unwrap();
        assert!(so < reddit);
    }

    #[test]
    fn test_failed_sources_are_omitted() {
        let query = Query::new("tokio graceful shutdown");
        let evidence = AggregatedEvidence {
            sources: vec![
                SourceEvidence::failed(SourceKind::IssueTrackerLike, SourceStatus::Failed, "HTTP 503"),
                SourceEvidence::ok(
                    SourceKind::AggregatorLike,
                    vec![result(SourceKind::AggregatorLike, "Shutdown patterns", 300)],
                ),
            ],
        };

        let prompt = build_prompt(&query, &evidence);
        assert!(!prompt.contains("GitHub Issues"));
        assert!(!prompt.contains("HTTP 503"));
        assert!(prompt.contains("### Hacker News"));
    }

    #[test]
    fn test_retry_prompt_names_failure() {
        let retry = build_retry_prompt("original prompt", &ParseFailure::Count(7));
        assert!(retry.starts_with("original prompt"));
        assert!(retry.contains("got 7"));
    }
}
