//! Hacker News story search through the Algolia API

use super::{fetch_json, truncate_chars, SourceClient, SourceError, SourceSettings, SNIPPET_CHARS};
use crate::sources::stackexchange::html_to_text;
use crate::types::{Query, SearchResult, SourceKind};
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;

/// Only stories with real traction are worth citing
const MIN_POINTS: u32 = 100;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "objectID")]
    object_id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    points: Option<i64>,
    #[serde(default)]
    story_text: Option<String>,
}

pub struct HackerNewsClient {
    http: reqwest::Client,
    settings: SourceSettings,
}

impl HackerNewsClient {
    pub fn new(http: reqwest::Client, settings: SourceSettings) -> Self {
        Self { http, settings }
    }

    async fn fetch(&self, text: &str) -> Result<SearchResponse, SourceError> {
        let request = self
            .http
            .get(self.settings.url("/search"))
            .header(reqwest::header::USER_AGENT, &self.settings.user_agent)
            .query(&[
                ("query", text.to_string()),
                ("tags", "story".to_string()),
                ("numericFilters", format!("points>{}", MIN_POINTS)),
                ("hitsPerPage", self.settings.max_results.to_string()),
            ]);

        fetch_json(request).await
    }
}

#[async_trait]
impl SourceClient for HackerNewsClient {
    fn kind(&self) -> SourceKind {
        SourceKind::AggregatorLike
    }

    async fn search(&self, query: &Query) -> Result<Vec<SearchResult>, SourceError> {
        let text = query.search_text();

        let response = self
            .settings
            .retry
            .run(self.kind(), || self.fetch(&text))
            .await?;

        let retrieved_at = Utc::now();
        Ok(response
            .hits
            .into_iter()
            .filter(|hit| hit.title.as_deref().is_some_and(|t| !t.trim().is_empty()))
            .take(self.settings.max_results)
            .map(|hit| SearchResult {
                source: SourceKind::AggregatorLike,
                url: hit
                    .url
                    .filter(|u| !u.is_empty())
                    .unwrap_or_else(|| format!("https://news.ycombinator.com/item?id={}", hit.object_id)),
                score: hit.points.unwrap_or_default(),
                snippet: truncate_chars(
                    &html_to_text(hit.story_text.as_deref().unwrap_or_default()),
                    SNIPPET_CHARS,
                ),
                title: hit.title.unwrap_or_default(),
                retrieved_at,
            })
            .collect())
    }
}
