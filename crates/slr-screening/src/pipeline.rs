//! Cascade screening pipeline.
//!
//! Layers run in configured order. The first layer whose confidence reaches
//! its threshold decides the article and later layers are not run; if none
//! does, the last layer that ran decides. A failing or timed-out layer
//! contributes an EXCLUDE/0.0 decision and the cascade moves on.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future;
use futures_util::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use slr_common::{Article, ArticleDecision, Criteria, LayerDecision, LayerKind, Outcome, Result, SlrError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::layers::ScreeningLayer;

pub const NO_APPLICABLE_LAYER: &str = "no applicable layer";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Articles screened at once.
    pub concurrency: usize,
    /// Budget for one layer call on one article.
    pub layer_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { concurrency: 8, layer_timeout_secs: 30 }
    }
}

pub struct ScreeningPipeline {
    layers: Vec<Arc<dyn ScreeningLayer>>,
    cfg: PipelineConfig,
}

impl ScreeningPipeline {
    pub fn new(layers: Vec<Arc<dyn ScreeningLayer>>, cfg: PipelineConfig) -> Result<Self> {
        if layers.is_empty() {
            return Err(SlrError::Config("screening pipeline needs at least one layer".to_string()));
        }
        Ok(Self { layers, cfg })
    }

    pub fn layer_kinds(&self) -> Vec<LayerKind> {
        self.layers.iter().map(|l| l.kind()).collect()
    }

    /// Screen one article through the cascade.
    pub async fn screen(&self, article: Article, criteria: &Criteria) -> ArticleDecision {
        let timeout = Duration::from_secs(self.cfg.layer_timeout_secs);
        let mut trail: Vec<LayerDecision> = Vec::with_capacity(self.layers.len());
        let mut accepted = None;

        for layer in self.layers.iter().filter(|l| l.applies_to(&article)) {
            let decision = match tokio::time::timeout(timeout, layer.evaluate(&article, criteria)).await {
                Ok(Ok(decision)) => decision,
                Ok(Err(e)) => {
                    warn!(id = %article.identifier, layer = %layer.kind(), "Layer failed: {}", e);
                    LayerDecision::failure(layer.kind(), e)
                }
                Err(_) => {
                    warn!(id = %article.identifier, layer = %layer.kind(), "Layer timed out after {:?}", timeout);
                    LayerDecision::failure(layer.kind(), format!("timed out after {}s", timeout.as_secs()))
                }
            };

            let done = decision.confidence >= layer.threshold();
            trail.push(decision);
            if done {
                accepted = Some(trail.len() - 1);
                break;
            }
        }

        if trail.is_empty() {
            // `new` guarantees at least one layer.
            let first = self.layers.first().map(|l| l.kind()).unwrap_or(LayerKind::Rule);
            trail.push(LayerDecision::new(first, Outcome::Exclude, 0.0, NO_APPLICABLE_LAYER));
        }

        let idx = accepted.unwrap_or(trail.len() - 1);
        let (final_outcome, final_layer) = (trail[idx].outcome, trail[idx].layer);
        debug!(
            id = %article.identifier,
            outcome = final_outcome.as_str(),
            layer = %final_layer,
            layers_run = trail.len(),
            "Article screened"
        );
        ArticleDecision { article, decisions: trail, final_outcome, final_layer }
    }

    /// Screen many articles concurrently; output keeps input order.
    ///
    /// Once `cancel` fires no further article is started and the result is
    /// a prefix of the input. In-flight articles still finish.
    /// `on_done` is called with the number of articles finished so far.
    pub async fn screen_all(
        &self,
        articles: Vec<Article>,
        criteria: &Criteria,
        cancel: &CancellationToken,
        on_done: &(dyn Fn(usize) + Send + Sync),
    ) -> Vec<ArticleDecision> {
        let total = articles.len();
        let mut finished = 0usize;

        let mut results: Vec<(usize, ArticleDecision)> = stream::iter(articles.into_iter().enumerate())
            .take_while(|_| future::ready(!cancel.is_cancelled()))
            .map(|(index, article)| async move { (index, self.screen(article, criteria).await) })
            .buffer_unordered(self.cfg.concurrency.max(1))
            .inspect(|_| {
                finished += 1;
                on_done(finished);
            })
            .collect()
            .await;

        results.sort_by_key(|(index, _)| *index);
        if results.len() < total {
            info!(screened = results.len(), total, "Screening stopped by cancellation");
        }
        results.into_iter().map(|(_, d)| d).collect()
    }
}
