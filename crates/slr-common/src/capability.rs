//! Capability traits for the external collaborators of a screening run.
//!
//! Every collaborator is an explicitly constructed, read-only object that is
//! handed to the workflow as `Arc<dyn Trait>`, so tests can substitute stubs.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::decision::{ArticleDecision, MetricsSummary, PrismaFlow};
use crate::entities::Article;
use crate::error::Result;

/// A literature database (PubMed, or a stub in tests).
#[async_trait]
pub trait ArticleSource: Send + Sync {
    /// Run a query and return matching identifiers, at most `max_results`.
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<String>>;

    /// Fetch full records for one batch of identifiers.
    async fn fetch(&self, identifiers: &[String]) -> Result<Vec<Article>>;

    fn name(&self) -> &str;
}

/// Zero-shot text classifier: scores `text` against each candidate label.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, text: &str, candidate_labels: &[String]) -> Result<HashMap<String, f64>>;

    fn model_id(&self) -> &str;
}

/// Text embedding model producing fixed-length vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    fn model_id(&self) -> &str;
}

/// One row of the exported decision table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    pub identifier: String,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub disease_match: Option<bool>,
    pub decision: String,
    pub confidence: f64,
    pub layer: String,
}

impl From<&ArticleDecision> for ResultRow {
    fn from(d: &ArticleDecision) -> Self {
        Self {
            identifier:    d.article.identifier.clone(),
            title:         d.article.title.clone(),
            abstract_text: d.article.abstract_text.clone(),
            disease_match: d.disease_match(),
            decision:      d.final_outcome.as_str().to_string(),
            confidence:    d.final_confidence(),
            layer:         d.final_layer.as_str().to_string(),
        }
    }
}

/// Durable destination for a finished run. Returns a stable reference (path or URL).
#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn write(
        &self,
        run_id: &str,
        rows: &[ResultRow],
        metrics: Option<&MetricsSummary>,
        prisma: &PrismaFlow,
    ) -> Result<String>;
}
