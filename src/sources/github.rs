//! GitHub issue search

use super::{fetch_json, truncate_chars, SourceClient, SourceError, SourceSettings, SNIPPET_CHARS};
use crate::types::{Query, SearchResult, SourceKind};
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<Issue>,
}

#[derive(Debug, Deserialize)]
struct Issue {
    title: String,
    html_url: String,
    #[serde(default)]
    comments: i64,
    #[serde(default)]
    reactions: Option<Reactions>,
    #[serde(default)]
    body: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Reactions {
    #[serde(default)]
    total_count: i64,
}

impl Issue {
    /// Reactions are the community signal; comments stand in when absent
    fn score(&self) -> i64 {
        match &self.reactions {
            Some(r) if r.total_count > 0 => r.total_count,
            _ => self.comments,
        }
    }
}

pub struct GitHubClient {
    http: reqwest::Client,
    settings: SourceSettings,
}

impl GitHubClient {
    pub fn new(http: reqwest::Client, settings: SourceSettings) -> Self {
        Self { http, settings }
    }

    fn search_qualifier(text: &str, language: Option<&str>) -> String {
        match language {
            Some(language) => format!("{} language:{} is:issue", text, language.to_lowercase()),
            None => format!("{} is:issue", text),
        }
    }

    async fn fetch(&self, q: &str) -> Result<SearchResponse, SourceError> {
        let mut request = self
            .http
            .get(self.settings.url("/search/issues"))
            .header(reqwest::header::USER_AGENT, &self.settings.user_agent)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .query(&[
                ("q", q.to_string()),
                ("sort", "reactions".to_string()),
                ("order", "desc".to_string()),
                ("per_page", self.settings.max_results.to_string()),
            ]);

        if let Some(token) = &self.settings.credential {
            request = request.bearer_auth(token.expose());
        }

        fetch_json(request).await
    }
}

#[async_trait]
impl SourceClient for GitHubClient {
    fn kind(&self) -> SourceKind {
        SourceKind::IssueTrackerLike
    }

    async fn search(&self, query: &Query) -> Result<Vec<SearchResult>, SourceError> {
        let q = Self::search_qualifier(&query.search_text(), query.language_hint());

        let response = self
            .settings
            .retry
            .run(self.kind(), || self.fetch(&q))
            .await?;

        let retrieved_at = Utc::now();
        Ok(response
            .items
            .into_iter()
            .take(self.settings.max_results)
            .map(|issue| SearchResult {
                source: SourceKind::IssueTrackerLike,
                score: issue.score(),
                snippet: truncate_chars(issue.body.as_deref().unwrap_or_default().trim(), SNIPPET_CHARS),
                title: issue.title,
                url: issue.html_url,
                retrieved_at,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_qualifier() {
        assert_eq!(
            GitHubClient::search_qualifier("Python celery retry", Some("Python")),
            "Python celery retry language:python is:issue"
        );
        assert_eq!(
            GitHubClient::search_qualifier("tokio select", None),
            "tokio select is:issue"
        );
    }

    #[test]
    fn test_score_falls_back_to_comments() {
        let issue: Issue = serde_json::from_value(serde_json::json!({
            "title": "t",
            "html_url": "https://github.com/o/r/issues/1",
            "comments": 7,
            "reactions": {"total_count": 0}
        }))
        .unwrap();
        assert_eq!(issue.score(), 7);

        let liked: Issue = serde_json::from_value(serde_json::json!({
            "title": "t",
            "html_url": "https://github.com/o/r/issues/2",
            "comments": 7,
            "reactions": {"total_count": 42}
        }))
        .unwrap();
        assert_eq!(liked.score(), 42);
    }
}
