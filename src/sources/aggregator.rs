//! Concurrent fan-out over all active sources
//!
//! Every source runs as its own task in a [`JoinSet`]. The aggregator waits
//! for all of them or for the aggregation deadline, whichever comes first.
//! Sources still running at the deadline are marked `timed_out`, and
//! dropping the set aborts them so their connections are released. The
//! same happens when the caller drops the `aggregate` future.

use super::SourceClient;
use crate::types::{
    AggregatedEvidence, AppError, Query, Result, SearchResult, SourceEvidence, SourceKind,
    SourceStatus,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

pub struct SearchAggregator {
    sources: Vec<Arc<dyn SourceClient>>,
    timeout: Duration,
}

impl SearchAggregator {
    pub fn new(sources: Vec<Arc<dyn SourceClient>>, timeout: Duration) -> Self {
        Self { sources, timeout }
    }

    /// Kinds of the active sources, in declaration order
    pub fn source_kinds(&self) -> Vec<SourceKind> {
        self.sources.iter().map(|s| s.kind()).collect()
    }

    /// Fan out and collect per-source evidence; never fails.
    ///
    /// Evidence is ordered by source position, each source's hits in the
    /// order it returned them.
    pub async fn gather(&self, query: &Query) -> AggregatedEvidence {
        let mut slots: Vec<Option<SourceEvidence>> = vec![None; self.sources.len()];
        let mut tasks = JoinSet::new();

        for (idx, source) in self.sources.iter().enumerate() {
            let source = Arc::clone(source);
            let query = query.clone();
            tasks.spawn(async move {
                let kind = source.kind();
                (idx, kind, source.search(&query).await)
            });
        }

        let deadline = tokio::time::Instant::now() + self.timeout;
        let mut deadline_hit = false;

        loop {
            match tokio::time::timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(Ok((idx, kind, outcome)))) => {
                    slots[idx] = Some(Self::evidence_for(kind, outcome));
                }
                Ok(Some(Err(join_err))) => {
                    tracing::error!(error = %join_err, "Source task failed to complete");
                }
                Ok(None) => break,
                Err(_) => {
                    deadline_hit = true;
                    break;
                }
            }
        }
        // aborts anything still in flight
        drop(tasks);

        let sources = slots
            .into_iter()
            .zip(self.sources.iter())
            .map(|(slot, source)| {
                slot.unwrap_or_else(|| {
                    let kind = source.kind();
                    if deadline_hit {
                        tracing::warn!(source = %kind, "Source did not finish before the aggregation deadline");
                        SourceEvidence::failed(kind, SourceStatus::TimedOut, "aggregation deadline exceeded")
                    } else {
                        SourceEvidence::failed(kind, SourceStatus::Failed, "source task aborted")
                    }
                })
            })
            .collect();

        AggregatedEvidence { sources }
    }

    /// Fan out and fail when no source produced a single hit.
    ///
    /// A lone active source that errors is reported as
    /// [`AppError::SourceUnavailable`]; otherwise empty evidence is
    /// [`AppError::NoResultsFound`].
    pub async fn aggregate(&self, query: &Query) -> Result<AggregatedEvidence> {
        if self.sources.is_empty() {
            return Err(AppError::Configuration(
                "no search sources are enabled".to_string(),
            ));
        }

        let evidence = self.gather(query).await;

        if evidence.is_empty() {
            if let [only] = evidence.sources.as_slice() {
                if !only.status.is_ok() {
                    return Err(AppError::SourceUnavailable {
                        origin: only.source,
                        reason: only.error.clone().unwrap_or_else(|| only.status.to_string()),
                    });
                }
            }
            return Err(AppError::NoResultsFound {
                topic: query.topic.clone(),
            });
        }

        tracing::info!(
            results = evidence.total_results(),
            contributing = evidence.contributing().count(),
            sources = evidence.sources.len(),
            "Search aggregation complete"
        );
        Ok(evidence)
    }

    fn evidence_for(
        kind: SourceKind,
        outcome: std::result::Result<Vec<SearchResult>, super::SourceError>,
    ) -> SourceEvidence {
        match outcome {
            Ok(results) => {
                tracing::debug!(source = %kind, count = results.len(), "Source returned results");
                SourceEvidence::ok(kind, results)
            }
            Err(err) => {
                tracing::warn!(source = %kind, error = %err, "Source search failed");
                SourceEvidence::failed(kind, err.status(), err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::{MockSourceClient, SourceError};
    use chrono::Utc;

    fn hit(source: SourceKind, title: &str) -> SearchResult {
        SearchResult {
            source,
            title: title.to_string(),
            url: format!("https://example.com/{}", title),
            score: 10,
            snippet: String::new(),
            retrieved_at: Utc::now(),
        }
    }

    fn mock_ok(kind: SourceKind, titles: &'static [&'static str]) -> Arc<dyn SourceClient> {
        let mut mock = MockSourceClient::new();
        mock.expect_kind().return_const(kind);
        mock.expect_search()
            .times(1)
            .returning(move |_| Ok(titles.iter().map(|t| hit(kind, t)).collect()));
        Arc::new(mock)
    }

    fn mock_err(kind: SourceKind, err: SourceError) -> Arc<dyn SourceClient> {
        let mut mock = MockSourceClient::new();
        mock.expect_kind().return_const(kind);
        mock.expect_search()
            .times(1)
            .returning(move |_| Err(err.clone()));
        Arc::new(mock)
    }

    fn query() -> Query {
        Query::new("FastAPI background task queue with Redis and Celery").with_language("Python")
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_successful_sources() {
        let aggregator = SearchAggregator::new(
            vec![
                mock_ok(SourceKind::StackExchangeLike, &["a", "b"]),
                mock_err(
                    SourceKind::IssueTrackerLike,
                    SourceError::Status {
                        status: 503,
                        body: "down".into(),
                    },
                ),
                mock_ok(SourceKind::ForumLike, &["c"]),
                mock_err(
                    SourceKind::AggregatorLike,
                    SourceError::RateLimited { retry_after: None },
                ),
            ],
            Duration::from_secs(5),
        );

        let evidence = aggregator.aggregate(&query()).await.unwrap();

        assert_eq!(evidence.total_results(), 3);
        assert_eq!(
            evidence.status_of(SourceKind::IssueTrackerLike),
            Some(SourceStatus::Failed)
        );
        assert_eq!(
            evidence.status_of(SourceKind::AggregatorLike),
            Some(SourceStatus::RateLimited)
        );
        let titles: Vec<_> = evidence.results().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_all_empty_is_no_results_found() {
        let aggregator = SearchAggregator::new(
            vec![
                mock_ok(SourceKind::StackExchangeLike, &[]),
                mock_err(
                    SourceKind::ForumLike,
                    SourceError::Network("refused".into()),
                ),
            ],
            Duration::from_secs(5),
        );

        let err = aggregator.aggregate(&query()).await.unwrap_err();
        assert!(matches!(err, AppError::NoResultsFound { .. }));
    }

    #[tokio::test]
    async fn test_only_source_failing_is_source_unavailable() {
        let aggregator = SearchAggregator::new(
            vec![mock_err(
                SourceKind::ForumLike,
                SourceError::Network("refused".into()),
            )],
            Duration::from_secs(5),
        );

        match aggregator.aggregate(&query()).await.unwrap_err() {
            AppError::SourceUnavailable { origin, reason } => {
                assert_eq!(origin, SourceKind::ForumLike);
                assert!(reason.contains("refused"));
            }
            other => panic!("expected SourceUnavailable, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_only_source_with_zero_hits_is_no_results() {
        let aggregator = SearchAggregator::new(
            vec![mock_ok(SourceKind::AggregatorLike, &[])],
            Duration::from_secs(5),
        );
        let err = aggregator.aggregate(&query()).await.unwrap_err();
        assert!(matches!(err, AppError::NoResultsFound { .. }));
    }

    struct StuckSource;

    #[async_trait::async_trait]
    impl SourceClient for StuckSource {
        fn kind(&self) -> SourceKind {
            SourceKind::IssueTrackerLike
        }

        async fn search(&self, _query: &Query) -> std::result::Result<Vec<SearchResult>, SourceError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn test_deadline_marks_stragglers_timed_out() {
        let aggregator = SearchAggregator::new(
            vec![
                mock_ok(SourceKind::StackExchangeLike, &["fast"]),
                Arc::new(StuckSource),
            ],
            Duration::from_millis(100),
        );

        let started = std::time::Instant::now();
        let evidence = aggregator.aggregate(&query()).await.unwrap();

        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(evidence.total_results(), 1);
        assert_eq!(
            evidence.status_of(SourceKind::IssueTrackerLike),
            Some(SourceStatus::TimedOut)
        );
    }

    #[tokio::test]
    async fn test_no_sources_is_configuration_error() {
        let aggregator = SearchAggregator::new(vec![], Duration::from_secs(1));
        let err = aggregator.aggregate(&query()).await.unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
    }
}
