//! Screening decisions with provenance, and the summaries derived from them.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::entities::Article;

/// The screening layers, in their conventional cascade order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LayerKind {
    Rule,
    Ml,
    Semantic,
    Human,
}

impl LayerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LayerKind::Rule     => "RULE",
            LayerKind::Ml       => "ML",
            LayerKind::Semantic => "SEMANTIC",
            LayerKind::Human    => "HUMAN",
        }
    }

    /// Parse a layer name as used in config files and URLs (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rule" | "rules"           => Some(LayerKind::Rule),
            "ml" | "classifier"        => Some(LayerKind::Ml),
            "semantic" | "bert"        => Some(LayerKind::Semantic),
            "human" | "manual"         => Some(LayerKind::Human),
            _ => None,
        }
    }
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    Include,
    Exclude,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Include => "INCLUDE",
            Outcome::Exclude => "EXCLUDE",
        }
    }

    pub fn is_include(&self) -> bool {
        matches!(self, Outcome::Include)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One layer's verdict on one article. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerDecision {
    pub layer: LayerKind,
    pub outcome: Outcome,
    pub confidence: f64,
    pub rationale: String,
}

impl LayerDecision {
    /// Build a decision; confidence is clamped into [0, 1] and NaN becomes 0.
    pub fn new(layer: LayerKind, outcome: Outcome, confidence: f64, rationale: impl Into<String>) -> Self {
        let confidence = if confidence.is_nan() { 0.0 } else { confidence.clamp(0.0, 1.0) };
        Self { layer, outcome, confidence, rationale: rationale.into() }
    }

    /// The decision recorded when a layer errors or times out.
    pub fn failure(layer: LayerKind, detail: impl fmt::Display) -> Self {
        Self::new(layer, Outcome::Exclude, 0.0, format!("layer failure: {detail}"))
    }

    pub fn is_failure(&self) -> bool {
        self.confidence == 0.0 && self.rationale.starts_with("layer failure")
    }
}

/// Final verdict on one article plus the full trail of layer decisions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleDecision {
    pub article: Article,
    pub decisions: Vec<LayerDecision>,
    pub final_outcome: Outcome,
    pub final_layer: LayerKind,
}

impl ArticleDecision {
    /// Build from the trail, taking the decision at `authoritative` as final.
    ///
    /// Returns `None` when the trail is empty or the index is out of range,
    /// so the outcome/layer invariant cannot be violated by construction.
    pub fn from_trail(article: Article, decisions: Vec<LayerDecision>, authoritative: usize) -> Option<Self> {
        let chosen = decisions.get(authoritative)?;
        let (final_outcome, final_layer) = (chosen.outcome, chosen.layer);
        Some(Self { article, decisions, final_outcome, final_layer })
    }

    /// The decision that became authoritative.
    pub fn final_decision(&self) -> Option<&LayerDecision> {
        self.decisions.iter().rev().find(|d| d.layer == self.final_layer)
    }

    pub fn final_confidence(&self) -> f64 {
        self.final_decision().map(|d| d.confidence).unwrap_or(0.0)
    }

    pub fn decision_for(&self, layer: LayerKind) -> Option<&LayerDecision> {
        self.decisions.iter().find(|d| d.layer == layer)
    }

    /// Whether the rule layer matched the disease; `None` if it did not run.
    pub fn disease_match(&self) -> Option<bool> {
        self.decision_for(LayerKind::Rule)
            .filter(|d| !d.is_failure())
            .map(|d| d.outcome.is_include())
    }
}

/// Precision / recall / F1 against explicit ground truth.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub accuracy: f64,
    pub true_positive: usize,
    pub false_positive: usize,
    pub true_negative: usize,
    pub false_negative: usize,
    /// Decisions whose article had no ground-truth label.
    pub unlabeled: usize,
}

/// Outcome counts that need no ground truth.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScreeningCounts {
    pub total: usize,
    pub included: usize,
    pub excluded: usize,
    pub decided_by_layer: BTreeMap<LayerKind, usize>,
    pub mean_confidence: f64,
}

/// PRISMA flow numbers for a run.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PrismaFlow {
    pub identified: usize,
    pub duplicates_removed: usize,
    pub screened: usize,
    pub excluded: usize,
    pub included: usize,
}
