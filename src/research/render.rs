//! Markdown and JSON rendering for results and errors
//!
//! Both formats are capped at a character limit. JSON output drops the
//! lower-ranked half of the recommendations (keeping at least one) until it
//! fits and says so in `truncated`/`truncation_message`; markdown is cut at
//! the limit with a trailing notice.

use crate::types::{AppError, RecommendationSet, ResponseFormat};

const MARKDOWN_TRUNCATION_NOTICE: &str =
    "\n\n[Response truncated due to size limits. Use JSON format for full data.]";

/// Render a recommendation set in the requested format
pub fn render_recommendations(
    set: &RecommendationSet,
    format: ResponseFormat,
    character_limit: usize,
) -> String {
    match format {
        ResponseFormat::Markdown => {
            truncate_markdown(recommendations_markdown(set), character_limit)
        }
        ResponseFormat::Json => recommendations_json(set, character_limit),
    }
}

/// Render an error in the requested format
pub fn render_error(err: &AppError, format: ResponseFormat) -> String {
    match format {
        ResponseFormat::Json => {
            serde_json::to_string_pretty(&err.to_json()).unwrap_or_else(|_| err.to_string())
        }
        ResponseFormat::Markdown => format!(
            "# Research Failed\n\n**Error**: {}\n**Kind**: `{}`\n**What to do**: {}\n",
            err,
            err.kind(),
            err.corrective_action()
        ),
    }
}

pub fn recommendations_markdown(set: &RecommendationSet) -> String {
    let mut out = format!("# Community Research: {}\n", set.query.topic);

    if let Some(language) = set.query.language_hint() {
        out.push_str(&format!("**Language**: {}\n", language));
    }
    if let Some(goal) = set.query.goal.as_deref() {
        out.push_str(&format!("**Goal**: {}\n", goal));
    }
    out.push_str(&format!(
        "*Synthesized by {} at {}*\n\n",
        set.provider,
        set.generated_at.format("%Y-%m-%d %H:%M UTC")
    ));

    out.push_str(&format!(
        "## Found {} Recommendations\n\n",
        set.recommendations.len()
    ));

    for (i, rec) in set.recommendations.iter().enumerate() {
        out.push_str(&format!("### {}. {}\n", i + 1, rec.title));
        out.push_str(&format!(
            "**Difficulty**: {} | **Evidence**: {} mentions, {} upvotes/stars\n\n",
            rec.difficulty, rec.evidence.mentions, rec.evidence.upvotes_or_stars
        ));
        out.push_str(&format!("{}\n\n", rec.description));

        if let Some(code) = &rec.code_example {
            out.push_str(&format!("```\n{}\n```\n\n", code));
        }

        if !rec.gotchas.is_empty() {
            out.push_str("**Gotchas**:\n");
            for gotcha in &rec.gotchas {
                out.push_str(&format!("- {}\n", gotcha));
            }
            out.push('\n');
        }
        out.push_str("---\n\n");
    }

    if !set.sources.is_empty() {
        out.push_str("## Sources Searched\n");
        for source in &set.sources {
            if source.status.is_ok() {
                out.push_str(&format!("- {}: {} results\n", source.source, source.result_count));
            } else {
                out.push_str(&format!("- {}: {}\n", source.source, source.status));
            }
        }
    }

    out
}

fn truncate_markdown(text: String, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => format!("{}{}", &text[..idx], MARKDOWN_TRUNCATION_NOTICE),
        None => text,
    }
}

fn recommendations_json(set: &RecommendationSet, limit: usize) -> String {
    let full = to_pretty(set);
    if full.chars().count() <= limit {
        return full;
    }

    let original = set.recommendations.len();
    let mut trimmed = set.clone();
    let mut rendered = full;

    while rendered.chars().count() > limit && trimmed.recommendations.len() > 1 {
        let keep = (trimmed.recommendations.len() / 2).max(1);
        trimmed.recommendations.truncate(keep);
        rendered = with_truncation(&trimmed, original);
    }

    if trimmed.recommendations.len() == original {
        // a single oversized recommendation; flag it anyway
        rendered = with_truncation(&trimmed, original);
    }
    rendered
}

fn with_truncation(set: &RecommendationSet, original: usize) -> String {
    let mut value = match serde_json::to_value(set) {
        Ok(value) => value,
        Err(_) => return to_pretty(set),
    };
    value["truncated"] = serde_json::json!(true);
    value["truncation_message"] = serde_json::json!(format!(
        "Response truncated from {} to {} recommendations due to size limits.",
        original,
        set.recommendations.len()
    ));
    serde_json::to_string_pretty(&value).unwrap_or_default()
}

fn to_pretty(set: &RecommendationSet) -> String {
    serde_json::to_string_pretty(set).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        Difficulty, EvidenceSignal, Query, Recommendation, SourceKind, SourceStatus, SourceSummary,
    };
    use chrono::Utc;
    use std::time::Duration;

    fn recommendation(i: usize, description: &str) -> Recommendation {
        Recommendation {
            title: format!("Approach {}", i),
            description: description.to_string(),
            code_example: Some("celery -A app worker".to_string()),
            evidence: EvidenceSignal {
                mentions: 3,
                upvotes_or_stars: 250,
            },
            difficulty: Difficulty::Medium,
            gotchas: vec!["Needs a broker".to_string()],
        }
    }

    fn sample_set(count: usize, description: &str) -> RecommendationSet {
        RecommendationSet {
            query: Query::new("FastAPI background task queue with Redis and Celery")
                .with_language("Python"),
            recommendations: (1..=count).map(|i| recommendation(i, description)).collect(),
            generated_at: Utc::now(),
            provider: "gemini".to_string(),
            sources: vec![
                SourceSummary {
                    source: SourceKind::StackExchangeLike,
                    status: SourceStatus::Ok,
                    result_count: 5,
                },
                SourceSummary {
                    source: SourceKind::IssueTrackerLike,
                    status: SourceStatus::TimedOut,
                    result_count: 0,
                },
            ],
        }
    }

    #[test]
    fn test_markdown_layout() {
        let md = render_recommendations(&sample_set(2, "Run a worker."), ResponseFormat::Markdown, 25_000);

        assert!(md.starts_with("# Community Research: FastAPI background task queue"));
        assert!(md.contains("**Language**: Python"));
        assert!(md.contains("## Found 2 Recommendations"));
        assert!(md.contains("### 2. Approach 2"));
        assert!(md.contains("**Difficulty**: Medium"));
        assert!(md.contains("```\ncelery -A app worker\n```"));
        assert!(md.contains("- Stack Overflow: 5 results"));
        assert!(md.contains("- GitHub Issues: timed out"));
    }

    #[test]
    fn test_json_round_trip() {
        let set = sample_set(3, "Run a worker.");
        let json = render_recommendations(&set, ResponseFormat::Json, 25_000);
        let back: RecommendationSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, set);
    }

    #[test]
    fn test_json_truncation_halves_recommendations() {
        let long = "x".repeat(2_000);
        let set = sample_set(5, &long);
        let json = render_recommendations(&set, ResponseFormat::Json, 6_000);

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["truncated"], true);
        let kept = value["recommendations"].as_array().unwrap().len();
        assert!((1..5).contains(&kept));
        assert!(value["truncation_message"]
            .as_str()
            .unwrap()
            .contains("from 5 to"));
    }

    #[test]
    fn test_markdown_truncation_notice() {
        let set = sample_set(5, &"y".repeat(1_000));
        let md = render_recommendations(&set, ResponseFormat::Markdown, 500);
        assert!(md.ends_with("Use JSON format for full data.]"));
        assert!(md.chars().count() <= 500 + MARKDOWN_TRUNCATION_NOTICE.chars().count());
    }

    #[test]
    fn test_error_rendering_in_both_formats() {
        let err = AppError::RateLimited {
            retry_after: Duration::from_secs(42),
        };

        let json: serde_json::Value =
            serde_json::from_str(&render_error(&err, ResponseFormat::Json)).unwrap();
        assert_eq!(json["kind"], "rate_limited");
        assert_eq!(json["retry_after_secs"], 42);
        assert!(json["action"].as_str().unwrap().contains("42 seconds"));

        let md = render_error(&err, ResponseFormat::Markdown);
        assert!(md.starts_with("# Research Failed"));
        assert!(md.contains("**What to do**: Wait 42 seconds"));
    }
}
