//! Strict parser for backend output
//!
//! The backend is asked for one JSON object with a fixed field list. Any
//! deviation (unknown field, wrong type, missing title, too many entries)
//! is a [`ParseFailure`]; nothing is scraped out of free text.

use crate::types::{Difficulty, EvidenceSignal, Recommendation};
use serde::Deserialize;

pub const MIN_RECOMMENDATIONS: usize = 1;
pub const MAX_RECOMMENDATIONS: usize = 5;

/// The response contract embedded in every synthesis prompt
pub const RESPONSE_SCHEMA: &str = r#"{
  "recommendations": [
    {
      "title": "string, short name of the approach",
      "description": "string, what to do and why the community recommends it",
      "code_example": "string or null, a minimal working snippet",
      "evidence": { "mentions": "integer >= 0", "upvotes_or_stars": "integer >= 0" },
      "difficulty": "one of: Easy, Medium, Hard",
      "gotchas": ["string, pitfalls reported by users"]
    }
  ]
}"#;

/// Why backend output could not be turned into recommendations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseFailure {
    #[error("output is empty")]
    Empty,

    #[error("output does not match the schema: {0}")]
    Schema(String),

    #[error("expected 1 to 5 recommendations, got {0}")]
    Count(usize),

    #[error("recommendation {index} has an empty `{field}`")]
    EmptyField { index: usize, field: &'static str },
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Payload {
    recommendations: Vec<RecommendationPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RecommendationPayload {
    title: String,
    description: String,
    #[serde(default)]
    code_example: Option<String>,
    evidence: EvidencePayload,
    difficulty: Difficulty,
    #[serde(default)]
    gotchas: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct EvidencePayload {
    mentions: u64,
    upvotes_or_stars: u64,
}

/// Remove one surrounding markdown code fence (```json ... ```), if present
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // drop the info string (`json`) on the opening line
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

/// Parse backend output into 1 to 5 recommendations
pub fn parse_recommendations(text: &str) -> Result<Vec<Recommendation>, ParseFailure> {
    let body = strip_code_fence(text);
    if body.is_empty() {
        return Err(ParseFailure::Empty);
    }

    let payload: Payload =
        serde_json::from_str(body).map_err(|e| ParseFailure::Schema(e.to_string()))?;

    let count = payload.recommendations.len();
    if !(MIN_RECOMMENDATIONS..=MAX_RECOMMENDATIONS).contains(&count) {
        return Err(ParseFailure::Count(count));
    }

    payload
        .recommendations
        .into_iter()
        .enumerate()
        .map(|(index, rec)| {
            let title = rec.title.trim().to_string();
            if title.is_empty() {
                return Err(ParseFailure::EmptyField {
                    index,
                    field: "title",
                });
            }
            let description = rec.description.trim().to_string();
            if description.is_empty() {
                return Err(ParseFailure::EmptyField {
                    index,
                    field: "description",
                });
            }

            Ok(Recommendation {
                title,
                description,
                code_example: rec
                    .code_example
                    .map(|c| c.trim().to_string())
                    .filter(|c| !c.is_empty()),
                evidence: EvidenceSignal {
                    mentions: rec.evidence.mentions,
                    upvotes_or_stars: rec.evidence.upvotes_or_stars,
                },
                difficulty: rec.difficulty,
                gotchas: rec
                    .gotchas
                    .into_iter()
                    .map(|g| g.trim().to_string())
                    .filter(|g| !g.is_empty())
                    .collect(),
            })
        })
        .collect()
}
