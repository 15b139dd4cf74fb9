//! Screening layers.
//!
//! Each layer looks at one article against the job's criteria and returns a
//! `LayerDecision`. The pipeline owns ordering, thresholds and failure
//! handling; a layer only has to answer for itself.

pub mod human;
pub mod ml;
pub mod rule;
pub mod semantic;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use slr_common::{Article, Criteria, LayerDecision, LayerKind, Result};

pub use human::HumanLayer;
pub use ml::MlLayer;
pub use rule::RuleLayer;
pub use semantic::SemanticLayer;

#[async_trait]
pub trait ScreeningLayer: Send + Sync {
    fn kind(&self) -> LayerKind;

    /// Confidence at or above which this layer's decision is final.
    fn threshold(&self) -> f64;

    /// Layers that do not apply are skipped and leave no decision.
    fn applies_to(&self, _article: &Article) -> bool {
        true
    }

    async fn evaluate(&self, article: &Article, criteria: &Criteria) -> Result<LayerDecision>;
}

/// Acceptance thresholds per layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub rule:     f64,
    pub ml:       f64,
    pub semantic: f64,
    pub human:    f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            rule:     0.85,
            ml:       0.70,
            semantic: 0.70,
            human:    1.0,
        }
    }
}

impl Thresholds {
    pub fn for_layer(&self, kind: LayerKind) -> f64 {
        match kind {
            LayerKind::Rule     => self.rule,
            LayerKind::Ml       => self.ml,
            LayerKind::Semantic => self.semantic,
            LayerKind::Human    => self.human,
        }
    }
}
