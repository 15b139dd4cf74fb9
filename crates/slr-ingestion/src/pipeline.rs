//! Retrieval pipeline: search once, then fetch records in batches.
//!
//! The pipeline is non-destructive: a failing search or batch is recorded
//! as a warning and the run continues with whatever was already fetched.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use slr_common::capability::ArticleSource;
use slr_common::{Article, SlrError};
use tracing::{info, instrument, warn};

/// Tuning for one retrieval run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Identifiers per fetch call.
    pub batch_size: usize,
    /// Pause between fetch calls (E-utilities allows ~3 req/s without a key).
    pub batch_delay_ms: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { batch_size: 100, batch_delay_ms: 350 }
    }
}

/// What a retrieval run produced.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Retrieval {
    pub articles: Vec<Article>,
    /// Identifiers returned by the search step.
    pub identifiers_found: usize,
    /// Absorbed source failures.
    pub warnings: Vec<String>,
}

/// Search `source` and fetch every hit in batches.
#[instrument(skip(source, cfg), fields(source_name = source.name()))]
pub async fn retrieve(
    source: &dyn ArticleSource,
    query: &str,
    max_results: usize,
    cfg: &RetrievalConfig,
) -> Retrieval {
    let mut result = Retrieval::default();

    let mut ids = match source.search(query, max_results).await {
        Ok(ids) => ids,
        Err(e) => {
            let msg = unavailable(source.name(), "search", e);
            warn!("{}", &msg);
            result.warnings.push(msg);
            return result;
        }
    };
    ids.truncate(max_results);
    result.identifiers_found = ids.len();
    info!(n = ids.len(), "Identifiers found");

    let batch_size = cfg.batch_size.max(1);
    for (i, batch) in ids.chunks(batch_size).enumerate() {
        if i > 0 {
            let delay = Duration::from_millis(cfg.batch_delay_ms);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
        match source.fetch(batch).await {
            Ok(articles) => result.articles.extend(articles),
            Err(e) => {
                let msg = unavailable(source.name(), &format!("fetch batch {i}"), e);
                warn!("{}", &msg);
                result.warnings.push(msg);
            }
        }
    }

    info!(fetched = result.articles.len(), warnings = result.warnings.len(), "Retrieval complete");
    result
}

fn unavailable(source: &str, step: &str, e: SlrError) -> String {
    match e {
        SlrError::SourceUnavailable(detail) => format!("{source} {step} unavailable: {detail}"),
        other => format!("{source} {step} unavailable: {other}"),
    }
}
