//! Deduplication of retrieved articles.
//!
//! Stage 1: identifier exact match (always).
//! Stage 2: embedding cosine similarity against already accepted articles
//!          (only when an embedder is supplied).
//!
//! Output order is input order minus the dropped records. The earlier
//! article always survives.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use slr_common::capability::Embedder;
use slr_common::similarity::best_match;
use slr_common::{Article, SlrError};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupConfig {
    /// Run the embedding stage when an embedder is available.
    pub near_duplicate: bool,
    /// Similarity strictly above this drops the newer article.
    pub threshold: f64,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self { near_duplicate: true, threshold: 0.92 }
    }
}

/// Why an article was dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DuplicateKind {
    /// Same identifier as an earlier record.
    Identifier,
    /// Title+abstract embedding too close to an earlier record.
    NearDuplicate { similarity: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateRecord {
    pub identifier: String,
    pub duplicate_of: String,
    #[serde(flatten)]
    pub kind: DuplicateKind,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DedupReport {
    pub articles: Vec<Article>,
    pub duplicates: Vec<DuplicateRecord>,
    /// Set when the embedding stage was requested but could not run.
    pub degraded: Option<String>,
}

pub struct Deduplicator {
    cfg: DedupConfig,
    embedder: Option<Arc<dyn Embedder>>,
}

impl Deduplicator {
    pub fn new(cfg: DedupConfig, embedder: Option<Arc<dyn Embedder>>) -> Self {
        Self { cfg, embedder }
    }

    pub fn exact_only() -> Self {
        Self::new(DedupConfig { near_duplicate: false, ..Default::default() }, None)
    }

    pub async fn dedupe(&self, articles: Vec<Article>) -> DedupReport {
        let input = articles.len();
        let (unique, mut duplicates) = dedupe_exact(articles);

        let report = match (&self.embedder, self.cfg.near_duplicate) {
            (Some(embedder), true) => match self.near_duplicates(embedder.as_ref(), &unique).await {
                Ok(near) => {
                    let dropped: HashSet<&str> = near.iter().map(|d| d.identifier.as_str()).collect();
                    let kept = unique
                        .iter()
                        .filter(|a| !dropped.contains(a.identifier.as_str()))
                        .cloned()
                        .collect();
                    duplicates.extend(near);
                    DedupReport { articles: kept, duplicates, degraded: None }
                }
                Err(e) => {
                    let msg = e.to_string();
                    warn!("Near-duplicate stage skipped, falling back to identifier match: {}", msg);
                    DedupReport { articles: unique, duplicates, degraded: Some(msg) }
                }
            },
            (None, true) => {
                let msg = SlrError::DeduplicationBackendUnavailable("no embedder configured".to_string()).to_string();
                warn!("{}; identifier dedup only", msg);
                DedupReport { articles: unique, duplicates, degraded: Some(msg) }
            }
            _ => DedupReport { articles: unique, duplicates, degraded: None },
        };

        info!(input, kept = report.articles.len(), dropped = report.duplicates.len(), "Deduplication complete");
        report
    }

    /// Find near duplicates among `articles` (already identifier-unique).
    /// Any embedding failure aborts the stage as a whole.
    async fn near_duplicates(
        &self,
        embedder: &dyn Embedder,
        articles: &[Article],
    ) -> Result<Vec<DuplicateRecord>, SlrError> {
        let mut accepted: Vec<Vec<f32>> = Vec::with_capacity(articles.len());
        let mut accepted_ids: Vec<&str> = Vec::with_capacity(articles.len());
        let mut found = Vec::new();
        let mut dim: Option<usize> = None;

        for article in articles {
            let vector = embedder
                .embed(&article.text())
                .await
                .map_err(|e| SlrError::DeduplicationBackendUnavailable(e.to_string()))?;

            match dim {
                None => dim = Some(vector.len()),
                Some(d) if d != vector.len() => {
                    return Err(SlrError::DeduplicationBackendUnavailable(format!(
                        "inconsistent embedding length: expected {d}, got {}",
                        vector.len()
                    )));
                }
                _ => {}
            }

            match best_match(&vector, &accepted) {
                Some((idx, similarity)) if similarity > self.cfg.threshold => {
                    debug!(id = %article.identifier, of = accepted_ids[idx], similarity, "Near duplicate");
                    found.push(DuplicateRecord {
                        identifier: article.identifier.clone(),
                        duplicate_of: accepted_ids[idx].to_string(),
                        kind: DuplicateKind::NearDuplicate { similarity },
                    });
                }
                _ => {
                    accepted.push(vector);
                    accepted_ids.push(&article.identifier);
                }
            }
        }
        Ok(found)
    }
}

/// Drop repeated identifiers; first occurrence wins, order preserved.
pub fn dedupe_exact(articles: Vec<Article>) -> (Vec<Article>, Vec<DuplicateRecord>) {
    let mut seen = HashSet::with_capacity(articles.len());
    let mut unique = Vec::with_capacity(articles.len());
    let mut duplicates = Vec::new();

    for article in articles {
        if seen.insert(article.identifier.clone()) {
            unique.push(article);
        } else {
            duplicates.push(DuplicateRecord {
                identifier: article.identifier.clone(),
                duplicate_of: article.identifier,
                kind: DuplicateKind::Identifier,
            });
        }
    }
    (unique, duplicates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;

    /// Embeds by looking the title up in a fixed table.
    struct TableEmbedder(HashMap<&'static str, Vec<f32>>);

    #[async_trait]
    impl Embedder for TableEmbedder {
        async fn embed(&self, text: &str) -> slr_common::Result<Vec<f32>> {
            self.0
                .get(text)
                .cloned()
                .ok_or_else(|| SlrError::Other(anyhow::anyhow!("no vector for {text}")))
        }
        fn model_id(&self) -> &str { "table" }
    }

    struct DownEmbedder;

    #[async_trait]
    impl Embedder for DownEmbedder {
        async fn embed(&self, _text: &str) -> slr_common::Result<Vec<f32>> {
            Err(SlrError::Other(anyhow::anyhow!("connection refused")))
        }
        fn model_id(&self) -> &str { "down" }
    }

    fn article(id: &str, title: &str) -> Article {
        Article::new(id, title, "")
    }

    fn ids(articles: &[Article]) -> Vec<&str> {
        articles.iter().map(|a| a.identifier.as_str()).collect()
    }

    #[test]
    fn test_exact_dedup_keeps_first() {
        let input = vec![article("1", "A"), article("1", "A again"), article("2", "B")];
        let (unique, dups) = dedupe_exact(input);
        assert_eq!(ids(&unique), vec!["1", "2"]);
        assert_eq!(unique[0].title, "A");
        assert_eq!(dups.len(), 1);
        assert_eq!(dups[0].kind, DuplicateKind::Identifier);
    }

    #[tokio::test]
    async fn test_near_duplicate_is_dropped_and_attributed() {
        let embedder = TableEmbedder(HashMap::from([
            ("alpha", vec![1.0, 0.0, 0.0]),
            ("beta", vec![0.0, 1.0, 0.0]),
            ("alpha copy", vec![0.99, 0.05, 0.0]),
        ]));
        let dedup = Deduplicator::new(DedupConfig::default(), Some(Arc::new(embedder)));
        let report = dedup
            .dedupe(vec![article("1", "alpha"), article("2", "beta"), article("3", "alpha copy")])
            .await;

        assert_eq!(ids(&report.articles), vec!["1", "2"]);
        assert!(report.degraded.is_none());
        assert_eq!(report.duplicates.len(), 1);
        assert_eq!(report.duplicates[0].identifier, "3");
        assert_eq!(report.duplicates[0].duplicate_of, "1");
    }

    #[tokio::test]
    async fn test_similarity_at_threshold_is_kept() {
        let embedder = TableEmbedder(HashMap::from([
            ("x", vec![1.0, 0.0]),
            ("y", vec![1.0, 0.0]),
        ]));
        let cfg = DedupConfig { near_duplicate: true, threshold: 1.0 };
        let report = Deduplicator::new(cfg, Some(Arc::new(embedder)))
            .dedupe(vec![article("1", "x"), article("2", "y")])
            .await;
        assert_eq!(ids(&report.articles), vec!["1", "2"]);
    }

    #[tokio::test]
    async fn test_backend_failure_degrades_to_exact() {
        let dedup = Deduplicator::new(DedupConfig::default(), Some(Arc::new(DownEmbedder)));
        let report = dedup
            .dedupe(vec![article("1", "a"), article("1", "a"), article("2", "b")])
            .await;
        assert_eq!(ids(&report.articles), vec!["1", "2"]);
        let msg = report.degraded.expect("degradation must be reported");
        assert!(msg.contains("connection refused"));
    }

    #[tokio::test]
    async fn test_exact_only_without_embedder() {
        let report = Deduplicator::exact_only()
            .dedupe(vec![article("2", "b"), article("1", "a"), article("2", "b")])
            .await;
        assert_eq!(ids(&report.articles), vec!["2", "1"]);
        assert!(report.degraded.is_none());
    }

    #[tokio::test]
    async fn test_missing_embedder_is_reported_when_near_duplicates_wanted() {
        let report = Deduplicator::new(DedupConfig::default(), None)
            .dedupe(vec![article("1", "a"), article("1", "a"), article("2", "b")])
            .await;
        assert_eq!(ids(&report.articles), vec!["1", "2"]);
        let msg = report.degraded.expect("missing backend must be reported");
        assert!(msg.contains("no embedder configured"));
    }
}
