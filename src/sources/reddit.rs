//! Reddit search, scoped to language-specific subreddits

use super::{fetch_json, truncate_chars, SourceClient, SourceError, SourceSettings, SNIPPET_CHARS};
use crate::types::{Query, SearchResult, SourceKind};
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;

const PERMALINK_BASE: &str = "https://www.reddit.com";

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: Post,
}

#[derive(Debug, Deserialize)]
struct Post {
    title: String,
    permalink: String,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    selftext: String,
}

/// Subreddits searched for a language, joined for a multi-reddit path
pub fn subreddits_for(language: Option<&str>) -> &'static str {
    let language = language.map(str::to_lowercase);
    match language.as_deref() {
        Some("python") => "python+learnpython+pythontips",
        Some("javascript") | Some("js") => "javascript+learnjavascript+reactjs",
        Some("typescript") | Some("ts") => "typescript+javascript",
        Some("java") => "java+learnjava",
        Some("rust") => "rust",
        Some("go") | Some("golang") => "golang",
        Some("cpp") | Some("c++") => "cpp_questions+cpp",
        Some("csharp") | Some("c#") => "csharp",
        _ => "programming+learnprogramming",
    }
}

pub struct RedditClient {
    http: reqwest::Client,
    settings: SourceSettings,
}

impl RedditClient {
    pub fn new(http: reqwest::Client, settings: SourceSettings) -> Self {
        Self { http, settings }
    }

    async fn fetch(&self, text: &str, subreddits: &str) -> Result<Listing, SourceError> {
        let request = self
            .http
            .get(self.settings.url(&format!("/r/{}/search.json", subreddits)))
            .header(reqwest::header::USER_AGENT, &self.settings.user_agent)
            .query(&[
                ("q", text.to_string()),
                ("sort", "relevance".to_string()),
                ("limit", self.settings.max_results.to_string()),
                ("restrict_sr", "on".to_string()),
            ]);

        fetch_json(request).await
    }
}

#[async_trait]
impl SourceClient for RedditClient {
    fn kind(&self) -> SourceKind {
        SourceKind::ForumLike
    }

    async fn search(&self, query: &Query) -> Result<Vec<SearchResult>, SourceError> {
        let text = query.search_text();
        let subreddits = subreddits_for(query.language_hint());

        let listing = self
            .settings
            .retry
            .run(self.kind(), || self.fetch(&text, subreddits))
            .await?;

        let retrieved_at = Utc::now();
        Ok(listing
            .data
            .children
            .into_iter()
            .take(self.settings.max_results)
            .map(|child| {
                let post = child.data;
                SearchResult {
                    source: SourceKind::ForumLike,
                    url: format!("{}{}", PERMALINK_BASE, post.permalink),
                    score: post.score,
                    snippet: truncate_chars(post.selftext.trim(), SNIPPET_CHARS),
                    title: post.title,
                    retrieved_at,
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subreddit_mapping() {
        assert_eq!(
            subreddits_for(Some("Python")),
            "python+learnpython+pythontips"
        );
        assert_eq!(subreddits_for(Some("C++")), "cpp_questions+cpp");
        assert_eq!(subreddits_for(Some("rust")), "rust");
        assert_eq!(subreddits_for(Some("cobol")), "programming+learnprogramming");
        assert_eq!(subreddits_for(None), "programming+learnprogramming");
    }
}
