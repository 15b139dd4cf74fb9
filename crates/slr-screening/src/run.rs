//! Job runner: one screening run from criteria to exported table.
//!
//! Stages:
//!   1. Build the PubMed query (or take the caller's override)
//!   2. Retrieve articles, absorbing source failures as warnings
//!   3. Deduplicate (identifier, then embedding near-duplicates)
//!   4. Screen through the layer cascade
//!   5. Summarize, score against ground truth if supplied
//!   6. Write the decision table to the result sink
//!
//! Only invalid criteria, pipeline configuration, cancellation and sink
//! failures end a run early. Everything else degrades and is reported.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use slr_common::capability::{ArticleSource, Classifier, Embedder, ResultRow, ResultSink};
use slr_common::{
    ArticleDecision, Criteria, LayerKind, MetricsSummary, Outcome, PrismaFlow, ScreeningCounts, SlrError,
};
use slr_ingestion::dedup::{DedupConfig, Deduplicator, DuplicateRecord};
use slr_ingestion::pipeline::{retrieve, RetrievalConfig};
use slr_ingestion::query::build_query;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::layers::rule;
use crate::layers::semantic::criteria_exemplar;
use crate::layers::{HumanLayer, MlLayer, RuleLayer, ScreeningLayer, SemanticLayer, Thresholds};
use crate::metrics;
use crate::pipeline::{PipelineConfig, ScreeningPipeline};

// ── Inputs ────────────────────────────────────────────────────────────────────

/// What a caller submits for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRequest {
    #[serde(flatten)]
    pub criteria: Criteria,
    /// Raw PubMed query replacing the one built from the criteria.
    #[serde(default)]
    pub query: Option<String>,
    /// Reviewer labels (identifier → relevant) used only for metrics.
    #[serde(default)]
    pub ground_truth: Option<HashMap<String, bool>>,
    /// Reviewer decisions replayed by the human layer.
    #[serde(default)]
    pub manual_decisions: HashMap<String, Outcome>,
}

impl JobRequest {
    pub fn new(criteria: Criteria) -> Self {
        Self { criteria, query: None, ground_truth: None, manual_decisions: HashMap::new() }
    }

    pub fn effective_query(&self) -> String {
        match self.query.as_deref().map(str::trim) {
            Some(q) if !q.is_empty() => q.to_string(),
            _ => build_query(&self.criteria),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub retrieval: RetrievalConfig,
    pub dedup: DedupConfig,
    pub pipeline: PipelineConfig,
    pub thresholds: Thresholds,
    /// Cascade order. HUMAN leads by default so recorded reviewer decisions
    /// are final; it skips articles without one.
    pub layers: Vec<LayerKind>,
    /// Texts of known-relevant articles for the semantic layer. When empty a
    /// description built from the criteria is used.
    pub exemplars: Vec<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            retrieval: RetrievalConfig::default(),
            dedup: DedupConfig::default(),
            pipeline: PipelineConfig::default(),
            thresholds: Thresholds::default(),
            layers: vec![LayerKind::Human, LayerKind::Rule, LayerKind::Ml, LayerKind::Semantic],
            exemplars: Vec::new(),
        }
    }
}

/// Shared, read-only collaborators of every run.
#[derive(Clone)]
pub struct Services {
    pub source: Arc<dyn ArticleSource>,
    pub classifier: Option<Arc<dyn Classifier>>,
    pub embedder: Option<Arc<dyn Embedder>>,
    pub sink: Arc<dyn ResultSink>,
}

// ── Outputs ───────────────────────────────────────────────────────────────────

/// Progress notifications emitted while a run advances.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum Progress {
    Retrieved { identifiers_found: usize, fetched: usize },
    Deduplicated { kept: usize, dropped: usize },
    Screening { done: usize, total: usize },
    Exported { reference: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub job_id: String,
    pub query: String,
    pub decisions: Vec<ArticleDecision>,
    pub metrics: Option<MetricsSummary>,
    pub counts: ScreeningCounts,
    pub total_fetched: usize,
    pub after_dedup: usize,
    pub duplicates: Vec<DuplicateRecord>,
    pub prisma: PrismaFlow,
    pub layers: Vec<LayerKind>,
    pub warnings: Vec<String>,
    pub sink_reference: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunResult {
    fn empty(job_id: &str, query: String) -> Self {
        Self {
            job_id: job_id.to_string(),
            query,
            decisions: Vec::new(),
            metrics: None,
            counts: ScreeningCounts::default(),
            total_fetched: 0,
            after_dedup: 0,
            duplicates: Vec::new(),
            prisma: PrismaFlow::default(),
            layers: Vec::new(),
            warnings: Vec::new(),
            sink_reference: None,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn decision_for(&self, identifier: &str) -> Option<&ArticleDecision> {
        self.decisions.iter().find(|d| d.article.identifier == identifier)
    }
}

/// A run that ended early; whatever was computed is kept in `partial`.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct JobFailure {
    pub error: SlrError,
    pub partial: Box<RunResult>,
}

// ── Runner ────────────────────────────────────────────────────────────────────

/// Build the layer stack for one run. Layers whose backend is missing are
/// left out with a warning; the pipeline rejects an empty stack.
pub async fn build_layers(
    request: &JobRequest,
    services: &Services,
    cfg: &RunConfig,
    warnings: &mut Vec<String>,
) -> Vec<Arc<dyn ScreeningLayer>> {
    let mut layers: Vec<Arc<dyn ScreeningLayer>> = Vec::new();
    let mut seen = Vec::new();

    for &kind in &cfg.layers {
        if seen.contains(&kind) {
            continue;
        }
        seen.push(kind);
        let threshold = cfg.thresholds.for_layer(kind);

        match kind {
            LayerKind::Rule => layers.push(Arc::new(RuleLayer::new(threshold))),
            LayerKind::Ml => match &services.classifier {
                Some(classifier) => layers.push(Arc::new(MlLayer::new(classifier.clone(), threshold))),
                None => warnings.push("ML layer skipped: no classifier configured".to_string()),
            },
            LayerKind::Semantic => match &services.embedder {
                Some(embedder) => {
                    let exemplars = if cfg.exemplars.is_empty() {
                        vec![criteria_exemplar(&request.criteria)]
                    } else {
                        cfg.exemplars.clone()
                    };
                    match SemanticLayer::prepare(embedder.clone(), &exemplars, threshold).await {
                        Ok(layer) => layers.push(Arc::new(layer)),
                        Err(e) => warnings.push(format!("Semantic layer skipped: {e}")),
                    }
                }
                None => warnings.push("Semantic layer skipped: no embedder configured".to_string()),
            },
            LayerKind::Human => {
                layers.push(Arc::new(HumanLayer::new(request.manual_decisions.clone(), threshold)))
            }
        }
    }

    if !request.manual_decisions.is_empty() {
        let position = |k: LayerKind| layers.iter().position(|l| l.kind() == k);
        match (position(LayerKind::Human), position(LayerKind::Rule)) {
            (None, _) => warnings.push(format!(
                "{} manual decisions ignored: HUMAN layer not configured",
                request.manual_decisions.len()
            )),
            (Some(human_at), Some(rule_at)) if rule_at < human_at && rule_always_decides(cfg) => {
                warnings.push(format!(
                    "{} manual decisions unreachable: RULE runs before HUMAN and always decides",
                    request.manual_decisions.len()
                ))
            }
            _ => {}
        }
    }
    layers
}

#[instrument(skip_all, fields(job_id = %job_id, disease = %request.criteria.disease))]
pub async fn run_job(
    job_id: &str,
    request: &JobRequest,
    services: &Services,
    cfg: &RunConfig,
    cancel: &CancellationToken,
    progress: &(dyn Fn(Progress) + Send + Sync),
) -> std::result::Result<RunResult, JobFailure> {
    let query = request.effective_query();
    let mut result = RunResult::empty(job_id, query.clone());

    if let Err(error) = request.criteria.validate() {
        return Err(fail(error, result));
    }
    info!(%query, "Screening run started");

    // ── Retrieval ─────────────────────────────────────────────────────────
    let retrieval = retrieve(services.source.as_ref(), &query, request.criteria.max_results, &cfg.retrieval).await;
    result.total_fetched = retrieval.articles.len();
    result.warnings.extend(retrieval.warnings);
    progress(Progress::Retrieved {
        identifiers_found: retrieval.identifiers_found,
        fetched: result.total_fetched,
    });
    if cancel.is_cancelled() {
        return Err(fail(SlrError::Cancelled("stopped after retrieval".to_string()), result));
    }

    // ── Deduplication ─────────────────────────────────────────────────────
    let report = Deduplicator::new(cfg.dedup.clone(), services.embedder.clone())
        .dedupe(retrieval.articles)
        .await;
    if let Some(degraded) = report.degraded {
        result.warnings.push(degraded);
    }
    result.after_dedup = report.articles.len();
    result.duplicates = report.duplicates;
    progress(Progress::Deduplicated { kept: result.after_dedup, dropped: result.duplicates.len() });
    if cancel.is_cancelled() {
        return Err(fail(SlrError::Cancelled("stopped after deduplication".to_string()), result));
    }

    // ── Screening ─────────────────────────────────────────────────────────
    let layers = build_layers(request, services, cfg, &mut result.warnings).await;
    let pipeline = match ScreeningPipeline::new(layers, cfg.pipeline.clone()) {
        Ok(p) => p,
        Err(error) => return Err(fail(error, result)),
    };
    result.layers = pipeline.layer_kinds();

    let total = result.after_dedup;
    let on_done = |done: usize| {
        if done == total || done % 25 == 0 {
            progress(Progress::Screening { done, total });
        }
    };
    result.decisions = pipeline.screen_all(report.articles, &request.criteria, cancel, &on_done).await;

    // ── Aggregation ───────────────────────────────────────────────────────
    result.counts = metrics::summarize(&result.decisions);
    result.metrics = metrics::compute(&result.decisions, request.ground_truth.as_ref());
    result.prisma = PrismaFlow {
        identified: result.total_fetched,
        duplicates_removed: result.duplicates.len(),
        screened: result.counts.total,
        excluded: result.counts.excluded,
        included: result.counts.included,
    };

    if cancel.is_cancelled() {
        let error = SlrError::Cancelled(format!("stopped after {} of {} articles", result.decisions.len(), total));
        return Err(fail(error, result));
    }

    // ── Export ────────────────────────────────────────────────────────────
    let rows: Vec<ResultRow> = result.decisions.iter().map(ResultRow::from).collect();
    match services.sink.write(job_id, &rows, result.metrics.as_ref(), &result.prisma).await {
        Ok(reference) => {
            progress(Progress::Exported { reference: reference.clone() });
            result.sink_reference = Some(reference);
        }
        Err(error) => return Err(fail(error, result)),
    }

    result.finished_at = Some(Utc::now());
    info!(
        included = result.counts.included,
        excluded = result.counts.excluded,
        warnings = result.warnings.len(),
        "Screening run complete"
    );
    Ok(result)
}

/// The rule layer's weakest branch still clears its threshold.
fn rule_always_decides(cfg: &RunConfig) -> bool {
    cfg.thresholds.rule <= rule::DISEASE_ONLY.min(rule::NO_MATCH)
}

fn fail(error: SlrError, mut partial: RunResult) -> JobFailure {
    warn!("Screening run failed: {}", error);
    partial.finished_at = Some(Utc::now());
    JobFailure { error, partial: Box::new(partial) }
}
