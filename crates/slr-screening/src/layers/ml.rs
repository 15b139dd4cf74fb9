//! Zero-shot classifier layer.

use std::sync::Arc;

use async_trait::async_trait;
use slr_common::capability::Classifier;
use slr_common::{Article, Criteria, LayerDecision, LayerKind, Outcome, Result, SlrError};

use super::ScreeningLayer;

pub struct MlLayer {
    classifier: Arc<dyn Classifier>,
    threshold: f64,
}

impl MlLayer {
    pub fn new(classifier: Arc<dyn Classifier>, threshold: f64) -> Self {
        Self { classifier, threshold }
    }
}

/// The {relevant, irrelevant} label pair for a set of criteria.
pub fn candidate_labels(criteria: &Criteria) -> [String; 2] {
    let topic = match criteria.study_type() {
        Some(st) => format!("{} {st}", criteria.disease.trim()),
        None => criteria.disease.trim().to_string(),
    };
    [format!("relevant to {topic}"), format!("not relevant to {topic}")]
}

#[async_trait]
impl ScreeningLayer for MlLayer {
    fn kind(&self) -> LayerKind {
        LayerKind::Ml
    }

    fn threshold(&self) -> f64 {
        self.threshold
    }

    async fn evaluate(&self, article: &Article, criteria: &Criteria) -> Result<LayerDecision> {
        let labels = candidate_labels(criteria);
        let scores = self.classifier.classify(&article.text(), &labels).await?;
        let relevant = &labels[0];
        let confidence = *scores.get(relevant).ok_or_else(|| {
            SlrError::LayerEvaluation(format!("{} returned no score for '{relevant}'", self.classifier.model_id()))
        })?;

        // Strictly above: a score exactly at threshold excludes.
        let outcome = if confidence > self.threshold { Outcome::Include } else { Outcome::Exclude };
        Ok(LayerDecision::new(
            LayerKind::Ml,
            outcome,
            confidence,
            format!("{}: P('{relevant}') = {confidence:.3}", self.classifier.model_id()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct Fixed(f64);

    #[async_trait]
    impl Classifier for Fixed {
        async fn classify(&self, _text: &str, labels: &[String]) -> Result<HashMap<String, f64>> {
            Ok(HashMap::from([(labels[0].clone(), self.0), (labels[1].clone(), 1.0 - self.0)]))
        }
        fn model_id(&self) -> &str { "fixed" }
    }

    struct WrongLabels;

    #[async_trait]
    impl Classifier for WrongLabels {
        async fn classify(&self, _text: &str, _labels: &[String]) -> Result<HashMap<String, f64>> {
            Ok(HashMap::from([("something else".to_string(), 0.99)]))
        }
        fn model_id(&self) -> &str { "wrong" }
    }

    fn article() -> Article {
        Article::new("1", "Metformin in PCOS", "")
    }

    #[test]
    fn test_labels_include_study_type() {
        let c = Criteria { study_type: Some("cohort study".into()), ..Criteria::for_disease(" PCOS ") };
        let [relevant, irrelevant] = candidate_labels(&c);
        assert_eq!(relevant, "relevant to PCOS cohort study");
        assert_eq!(irrelevant, "not relevant to PCOS cohort study");
    }

    #[tokio::test]
    async fn test_score_above_threshold_includes() {
        let layer = MlLayer::new(Arc::new(Fixed(0.82)), 0.70);
        let d = layer.evaluate(&article(), &Criteria::for_disease("PCOS")).await.unwrap();
        assert_eq!(d.outcome, Outcome::Include);
        assert!((d.confidence - 0.82).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_score_at_threshold_excludes() {
        let layer = MlLayer::new(Arc::new(Fixed(0.70)), 0.70);
        let d = layer.evaluate(&article(), &Criteria::for_disease("PCOS")).await.unwrap();
        assert_eq!(d.outcome, Outcome::Exclude);
    }

    #[tokio::test]
    async fn test_missing_relevant_label_is_an_error() {
        let layer = MlLayer::new(Arc::new(WrongLabels), 0.70);
        let err = layer.evaluate(&article(), &Criteria::for_disease("PCOS")).await.unwrap_err();
        assert!(matches!(err, SlrError::LayerEvaluation(_)));
    }
}
