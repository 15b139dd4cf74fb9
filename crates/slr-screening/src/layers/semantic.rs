//! Semantic similarity layer: max cosine similarity between the article
//! embedding and the embeddings of known-relevant exemplar texts.

use std::sync::Arc;

use async_trait::async_trait;
use slr_common::capability::Embedder;
use slr_common::similarity::best_match;
use slr_common::{Article, Criteria, LayerDecision, LayerKind, Outcome, Result, SlrError};
use tracing::debug;

use super::ScreeningLayer;

pub struct SemanticLayer {
    embedder: Arc<dyn Embedder>,
    exemplars: Vec<Vec<f32>>,
    threshold: f64,
}

impl SemanticLayer {
    /// Embed `exemplar_texts` once up front.
    pub async fn prepare(embedder: Arc<dyn Embedder>, exemplar_texts: &[String], threshold: f64) -> Result<Self> {
        if exemplar_texts.is_empty() {
            return Err(SlrError::Config("semantic layer needs at least one exemplar".to_string()));
        }
        let mut exemplars = Vec::with_capacity(exemplar_texts.len());
        for text in exemplar_texts {
            exemplars.push(embedder.embed(text).await?);
        }
        debug!(n = exemplars.len(), model = embedder.model_id(), "Semantic exemplars embedded");
        Ok(Self { embedder, exemplars, threshold })
    }

    pub fn with_vectors(embedder: Arc<dyn Embedder>, exemplars: Vec<Vec<f32>>, threshold: f64) -> Self {
        Self { embedder, exemplars, threshold }
    }
}

/// A one-line description of what a relevant article looks like.
pub fn criteria_exemplar(criteria: &Criteria) -> String {
    [
        criteria.study_type(),
        Some(criteria.disease.trim()),
        criteria.population.as_deref(),
        criteria.intervention.as_deref(),
    ]
    .into_iter()
    .flatten()
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .collect::<Vec<_>>()
    .join(" ")
}

#[async_trait]
impl ScreeningLayer for SemanticLayer {
    fn kind(&self) -> LayerKind {
        LayerKind::Semantic
    }

    fn threshold(&self) -> f64 {
        self.threshold
    }

    async fn evaluate(&self, article: &Article, _criteria: &Criteria) -> Result<LayerDecision> {
        let vector = self.embedder.embed(&article.text()).await?;
        let (idx, similarity) = best_match(&vector, &self.exemplars).ok_or_else(|| {
            SlrError::LayerEvaluation(format!(
                "no comparable exemplar (article vector has {} dims)",
                vector.len()
            ))
        })?;

        let confidence = similarity.clamp(0.0, 1.0);
        let outcome = if confidence >= self.threshold { Outcome::Include } else { Outcome::Exclude };
        Ok(LayerDecision::new(
            LayerKind::Semantic,
            outcome,
            confidence,
            format!("cosine {confidence:.3} to exemplar #{idx}"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Axis;

    #[async_trait]
    impl Embedder for Axis {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            Ok(if text.contains("pcos") { vec![1.0, 0.0] } else { vec![0.0, 1.0] })
        }
        fn model_id(&self) -> &str { "axis" }
    }

    #[test]
    fn test_criteria_exemplar_skips_blank_parts() {
        let c = Criteria {
            study_type: Some("randomized controlled trial".into()),
            intervention: Some("  ".into()),
            population: Some("women".into()),
            ..Criteria::for_disease("PCOS")
        };
        assert_eq!(criteria_exemplar(&c), "randomized controlled trial PCOS women");
    }

    #[tokio::test]
    async fn test_similar_article_includes() {
        let layer = SemanticLayer::prepare(Arc::new(Axis), &["pcos trial".to_string()], 0.70).await.unwrap();
        let d = layer.evaluate(&Article::new("1", "pcos cohort", ""), &Criteria::for_disease("pcos")).await.unwrap();
        assert_eq!(d.outcome, Outcome::Include);
        assert_eq!(d.confidence, 1.0);
    }

    #[tokio::test]
    async fn test_orthogonal_article_excludes_at_zero() {
        let layer = SemanticLayer::prepare(Arc::new(Axis), &["pcos trial".to_string()], 0.70).await.unwrap();
        let d = layer.evaluate(&Article::new("2", "asthma", ""), &Criteria::for_disease("pcos")).await.unwrap();
        assert_eq!(d.outcome, Outcome::Exclude);
        assert_eq!(d.confidence, 0.0);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_an_error() {
        let layer = SemanticLayer::with_vectors(Arc::new(Axis), vec![vec![1.0, 0.0, 0.0]], 0.70);
        assert!(layer.evaluate(&Article::new("3", "pcos", ""), &Criteria::for_disease("pcos")).await.is_err());
    }

    #[tokio::test]
    async fn test_no_exemplars_is_a_config_error() {
        assert!(matches!(
            SemanticLayer::prepare(Arc::new(Axis), &[], 0.70).await,
            Err(SlrError::Config(_))
        ));
    }
}
