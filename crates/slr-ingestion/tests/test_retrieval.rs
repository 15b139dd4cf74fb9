//! Retrieval and dedup against an in-memory article source.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use slr_common::capability::ArticleSource;
use slr_common::{Article, Result, SlrError};
use slr_ingestion::dedup::Deduplicator;
use slr_ingestion::pipeline::{retrieve, RetrievalConfig};

/// Serves `count` articles; fetch calls listed in `failing_batches` error out.
struct StubSource {
    count: usize,
    failing_batches: Vec<usize>,
    search_fails: bool,
    calls: AtomicUsize,
}

impl StubSource {
    fn new(count: usize) -> Self {
        Self { count, failing_batches: vec![], search_fails: false, calls: AtomicUsize::new(0) }
    }
}

#[async_trait]
impl ArticleSource for StubSource {
    async fn search(&self, _query: &str, max_results: usize) -> Result<Vec<String>> {
        if self.search_fails {
            return Err(SlrError::SourceUnavailable("503 Service Unavailable".into()));
        }
        Ok((1..=self.count.min(max_results)).map(|i| i.to_string()).collect())
    }

    async fn fetch(&self, identifiers: &[String]) -> Result<Vec<Article>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_batches.contains(&call) {
            return Err(SlrError::SourceUnavailable("timeout".into()));
        }
        Ok(identifiers
            .iter()
            .map(|id| Article::new(id.clone(), format!("Article {id}"), ""))
            .collect())
    }

    fn name(&self) -> &str {
        "stub"
    }
}

fn fast(batch_size: usize) -> RetrievalConfig {
    RetrievalConfig { batch_size, batch_delay_ms: 0 }
}

#[tokio::test]
async fn test_fetches_in_batches_preserving_order() {
    let source = StubSource::new(7);
    let result = retrieve(&source, "q", 100, &fast(3)).await;

    assert_eq!(result.identifiers_found, 7);
    assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    let ids: Vec<_> = result.articles.iter().map(|a| a.identifier.as_str()).collect();
    assert_eq!(ids, vec!["1", "2", "3", "4", "5", "6", "7"]);
    assert!(result.warnings.is_empty());
}

#[tokio::test]
async fn test_failed_batch_keeps_other_batches() {
    let source = StubSource { failing_batches: vec![1], ..StubSource::new(6) };
    let result = retrieve(&source, "q", 100, &fast(2)).await;

    let ids: Vec<_> = result.articles.iter().map(|a| a.identifier.as_str()).collect();
    assert_eq!(ids, vec!["1", "2", "5", "6"]);
    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].contains("fetch batch 1"));
}

#[tokio::test]
async fn test_failed_search_yields_empty_run_with_warning() {
    let source = StubSource { search_fails: true, ..StubSource::new(6) };
    let result = retrieve(&source, "q", 100, &fast(2)).await;

    assert!(result.articles.is_empty());
    assert_eq!(result.identifiers_found, 0);
    assert!(result.warnings[0].contains("503"));
}

#[tokio::test]
async fn test_max_results_caps_identifiers() {
    let source = StubSource::new(50);
    let result = retrieve(&source, "q", 3, &fast(100)).await;
    assert_eq!(result.articles.len(), 3);
}

#[tokio::test]
async fn test_dedup_of_repeated_identifiers() {
    let a1 = Article::new("1", "A", "");
    let report = Deduplicator::exact_only()
        .dedupe(vec![a1.clone(), a1.clone(), Article::new("2", "B", "")])
        .await;
    assert_eq!(report.articles, vec![a1, Article::new("2", "B", "")]);
}
