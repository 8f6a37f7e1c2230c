//! Stack Exchange (Stack Overflow) question search

use super::{fetch_json, truncate_chars, SourceClient, SourceError, SourceSettings, SNIPPET_CHARS};
use crate::types::{Query, SearchResult, SourceKind};
use async_trait::async_trait;
use chrono::Utc;
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<Question>,
}

#[derive(Debug, Deserialize)]
struct Question {
    title: String,
    link: String,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    body: Option<String>,
}

pub struct StackExchangeClient {
    http: reqwest::Client,
    settings: SourceSettings,
}

impl StackExchangeClient {
    pub fn new(http: reqwest::Client, settings: SourceSettings) -> Self {
        Self { http, settings }
    }

    async fn fetch(
        &self,
        text: &str,
        language: Option<&str>,
    ) -> Result<SearchResponse, SourceError> {
        let mut params = vec![
            ("order", "desc".to_string()),
            ("sort", "relevance".to_string()),
            ("q", text.to_string()),
            ("site", "stackoverflow".to_string()),
            ("filter", "withbody".to_string()),
            ("pagesize", self.settings.max_results.to_string()),
        ];
        if let Some(language) = language {
            params.push(("tagged", language.to_lowercase()));
        }
        if let Some(key) = &self.settings.credential {
            params.push(("key", key.expose().to_string()));
        }

        let request = self
            .http
            .get(self.settings.url("/search/advanced"))
            .header(reqwest::header::USER_AGENT, &self.settings.user_agent)
            .query(&params);

        fetch_json(request).await
    }
}

/// Strip markup and decode the handful of entities the API emits
pub(crate) fn html_to_text(html: &str) -> String {
    let stripped = HTML_TAG.replace_all(html, " ");
    let decoded = stripped
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[async_trait]
impl SourceClient for StackExchangeClient {
    fn kind(&self) -> SourceKind {
        SourceKind::StackExchangeLike
    }

    async fn search(&self, query: &Query) -> Result<Vec<SearchResult>, SourceError> {
        let text = query.search_text();
        let language = query.language_hint();

        let response = self
            .settings
            .retry
            .run(self.kind(), || self.fetch(&text, language))
            .await?;

        let retrieved_at = Utc::now();
        Ok(response
            .items
            .into_iter()
            .take(self.settings.max_results)
            .map(|q| SearchResult {
                source: SourceKind::StackExchangeLike,
                title: html_to_text(&q.title),
                url: q.link,
                score: q.score,
                snippet: truncate_chars(&html_to_text(q.body.as_deref().unwrap_or_default()), SNIPPET_CHARS),
                retrieved_at,
            })
            .collect())
    }
}
