//! Human passthrough layer: replays decisions a reviewer already made.

use std::collections::HashMap;

use async_trait::async_trait;
use slr_common::{Article, Criteria, LayerDecision, LayerKind, Outcome, Result, SlrError};

use super::ScreeningLayer;

pub struct HumanLayer {
    recorded: HashMap<String, Outcome>,
    threshold: f64,
}

impl HumanLayer {
    pub fn new(recorded: HashMap<String, Outcome>, threshold: f64) -> Self {
        Self { recorded, threshold }
    }

    pub fn len(&self) -> usize {
        self.recorded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recorded.is_empty()
    }
}

#[async_trait]
impl ScreeningLayer for HumanLayer {
    fn kind(&self) -> LayerKind {
        LayerKind::Human
    }

    fn threshold(&self) -> f64 {
        self.threshold
    }

    fn applies_to(&self, article: &Article) -> bool {
        self.recorded.contains_key(&article.identifier)
    }

    async fn evaluate(&self, article: &Article, _criteria: &Criteria) -> Result<LayerDecision> {
        let outcome = self.recorded.get(&article.identifier).ok_or_else(|| {
            SlrError::LayerEvaluation(format!("no recorded decision for {}", article.identifier))
        })?;
        Ok(LayerDecision::new(LayerKind::Human, *outcome, 1.0, "recorded reviewer decision"))
    }
}
