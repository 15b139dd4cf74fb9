use thiserror::Error;

#[derive(Debug, Error)]
pub enum SlrError {
    /// Article source search or fetch failed. Absorbed by retrieval.
    #[error("Article source unavailable: {0}")]
    SourceUnavailable(String),

    /// A single screening layer failed. Absorbed by the pipeline.
    #[error("Layer evaluation failed: {0}")]
    LayerEvaluation(String),

    /// Near-duplicate backend missing or broken. Dedup degrades to exact match.
    #[error("Deduplication backend unavailable: {0}")]
    DeduplicationBackendUnavailable(String),

    /// Rejected at submission time; the job never runs.
    #[error("Invalid criteria: {0}")]
    InvalidCriteria(String),

    /// Export step failed; the job is marked FAILED.
    #[error("Result sink write failed: {0}")]
    SinkWrite(String),

    /// Dispatch stopped by the caller before every article was screened.
    #[error("Job cancelled: {0}")]
    Cancelled(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("XML parse error: {0}")]
    Xml(String),

    #[error("Security error: {0}")]
    Security(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, SlrError>;
