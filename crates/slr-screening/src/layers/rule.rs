//! Keyword rule layer.
//!
//!   disease + study type matched  → INCLUDE 0.95
//!   disease only                   → INCLUDE 0.90
//!   disease not matched            → EXCLUDE 0.90
//!
//! Disease terms are matched against title + abstract. Study type terms are
//! matched against the publication types, or against the text when the
//! record carries none.

use async_trait::async_trait;
use slr_common::vocabulary::{disease_terms, study_type_terms};
use slr_common::{Article, Criteria, LayerDecision, LayerKind, Outcome, Result};

use super::ScreeningLayer;

pub const BOTH_MATCH: f64 = 0.95;
pub const DISEASE_ONLY: f64 = 0.90;
pub const NO_MATCH: f64 = 0.90;

pub struct RuleLayer {
    threshold: f64,
}

impl RuleLayer {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// Pure decision function; the async trait method delegates here.
    pub fn decide(&self, article: &Article, criteria: &Criteria) -> LayerDecision {
        let text = article.text().to_lowercase();

        let disease = disease_terms(&criteria.disease);
        let Some(hit) = disease.iter().find(|t| text.contains(t.as_str())) else {
            return LayerDecision::new(
                LayerKind::Rule,
                Outcome::Exclude,
                NO_MATCH,
                format!("no mention of '{}' in title or abstract", criteria.disease),
            );
        };

        match criteria.study_type().map(|st| (st, study_type_match(article, &text, st))) {
            Some((st, true)) => LayerDecision::new(
                LayerKind::Rule,
                Outcome::Include,
                BOTH_MATCH,
                format!("matches disease ('{hit}') and study type ('{st}')"),
            ),
            Some((st, false)) => LayerDecision::new(
                LayerKind::Rule,
                Outcome::Include,
                DISEASE_ONLY,
                format!("matches disease ('{hit}'); study type '{st}' not found"),
            ),
            None => LayerDecision::new(
                LayerKind::Rule,
                Outcome::Include,
                DISEASE_ONLY,
                format!("matches disease ('{hit}')"),
            ),
        }
    }
}

impl Default for RuleLayer {
    fn default() -> Self {
        Self::new(super::Thresholds::default().rule)
    }
}

fn study_type_match(article: &Article, text: &str, study_type: &str) -> bool {
    let terms = study_type_terms(study_type);
    if article.publication_types.is_empty() {
        return terms.iter().any(|t| text.contains(t.as_str()));
    }
    article.publication_types.iter().any(|pt| {
        let pt = pt.to_lowercase();
        terms.iter().any(|t| pt.contains(t.as_str()))
    })
}

#[async_trait]
impl ScreeningLayer for RuleLayer {
    fn kind(&self) -> LayerKind {
        LayerKind::Rule
    }

    fn threshold(&self) -> f64 {
        self.threshold
    }

    async fn evaluate(&self, article: &Article, criteria: &Criteria) -> Result<LayerDecision> {
        Ok(self.decide(article, criteria))
    }
}
