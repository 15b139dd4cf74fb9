//! Configuration loading for the screening server.
//! Reads slr.toml from the current directory or the path in the SLR_CONFIG env var.
//! Secrets come from the environment (and `.env`) when the file leaves them empty.

use std::path::Path;

use serde::{Deserialize, Serialize};
use slr_common::LayerKind;
use slr_ingestion::dedup::DedupConfig;
use slr_ingestion::pipeline::RetrievalConfig;
use slr_ingestion::sources::PubMedConfig;
use slr_models::{ClassifierConfig, EmbeddingBackend, EmbeddingConfig};
use slr_screening::{PipelineConfig, RunConfig, Thresholds};
use tracing::warn;

pub const CONFIG_ENV: &str = "SLR_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "slr.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub pubmed: PubMedSection,
    #[serde(default)]
    pub screening: ScreeningSection,
    /// Absent means the ML layer is left out.
    pub classifier: Option<ClassifierSection>,
    /// Absent means no semantic layer and exact-only deduplication.
    pub embedding: Option<EmbeddingSection>,
    #[serde(default)]
    pub dedup: DedupSection,
    #[serde(default)]
    pub export: ExportSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Finished jobs kept in memory; the oldest are dropped beyond this.
    #[serde(default = "default_max_finished_jobs")]
    pub max_finished_jobs: usize,
}

fn default_host() -> String { "127.0.0.1".to_string() }
fn default_port() -> u16    { 3001 }
fn default_max_finished_jobs() -> usize { crate::state::DEFAULT_MAX_FINISHED_JOBS }

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: default_host(), port: default_port(), max_finished_jobs: default_max_finished_jobs() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PubMedSection {
    #[serde(default = "default_pubmed_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_request_delay")]
    pub request_delay_ms: u64,
}

fn default_pubmed_url()    -> String { slr_ingestion::sources::pubmed::DEFAULT_BASE_URL.to_string() }
fn default_batch_size()    -> usize  { 100 }
fn default_request_delay() -> u64    { 350 }

impl Default for PubMedSection {
    fn default() -> Self {
        Self {
            base_url: default_pubmed_url(),
            api_key: None,
            email: None,
            batch_size: default_batch_size(),
            request_delay_ms: default_request_delay(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreeningSection {
    #[serde(default = "default_rule_threshold")]
    pub rule_threshold: f64,
    #[serde(default = "default_ml_threshold")]
    pub ml_threshold: f64,
    #[serde(default = "default_semantic_threshold")]
    pub semantic_threshold: f64,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_layer_timeout")]
    pub layer_timeout_secs: u64,
    /// Cascade order by layer name: RULE, ML, SEMANTIC, HUMAN.
    #[serde(default = "default_layers")]
    pub layers: Vec<String>,
    #[serde(default)]
    pub exemplars: Vec<String>,
}

fn default_rule_threshold()     -> f64   { 0.85 }
fn default_ml_threshold()       -> f64   { 0.70 }
fn default_semantic_threshold() -> f64   { 0.70 }
fn default_concurrency()        -> usize { 8 }
fn default_layer_timeout()      -> u64   { 30 }

fn default_layers() -> Vec<String> {
    ["HUMAN", "RULE", "ML", "SEMANTIC"].iter().map(|s| s.to_string()).collect()
}

impl Default for ScreeningSection {
    fn default() -> Self {
        Self {
            rule_threshold: default_rule_threshold(),
            ml_threshold: default_ml_threshold(),
            semantic_threshold: default_semantic_threshold(),
            concurrency: default_concurrency(),
            layer_timeout_secs: default_layer_timeout(),
            layers: default_layers(),
            exemplars: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierSection {
    #[serde(default = "default_classifier_url")]
    pub base_url: String,
    #[serde(default = "default_classifier_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

fn default_classifier_url()   -> String { slr_models::classifier::DEFAULT_BASE_URL.to_string() }
fn default_classifier_model() -> String { slr_models::classifier::DEFAULT_MODEL.to_string() }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingSection {
    #[serde(default = "default_embed_backend")]
    pub backend: EmbeddingBackend,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_embed_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_embed_cache")]
    pub cache_capacity: usize,
}

fn default_embed_backend() -> EmbeddingBackend { EmbeddingBackend::Ollama }
fn default_embed_model()   -> String { "nomic-embed-text".to_string() }
fn default_embed_cache()   -> usize  { slr_models::cache::DEFAULT_CAPACITY }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupSection {
    #[serde(default = "bool_true")]
    pub enabled: bool,
    #[serde(default = "default_dedup_threshold")]
    pub threshold: f64,
}

fn bool_true()               -> bool { true }
fn default_dedup_threshold() -> f64  { 0.92 }

impl Default for DedupSection {
    fn default() -> Self {
        Self { enabled: true, threshold: default_dedup_threshold() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportSection {
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

fn default_output_dir() -> String { "./output".to_string() }

impl Default for ExportSection {
    fn default() -> Self {
        Self { output_dir: default_output_dir() }
    }
}

mod tests;

impl Config {
    /// Load configuration from slr.toml.
    /// Checks SLR_CONFIG env var first, then current directory. A missing
    /// file is not an error; defaults are used.
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        let mut config = if Path::new(&path).exists() {
            let content = std::fs::read_to_string(&path)?;
            Self::parse(&content)?
        } else {
            warn!("Config file not found: {} (using defaults)", path);
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        // Fail at startup rather than on the first job.
        config.layer_order()?;
        Ok(config)
    }

    /// Fill empty secrets from the environment.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        fill(&mut self.pubmed.api_key, lookup("PUBMED_API_KEY"));
        if let Some(c) = self.classifier.as_mut() {
            fill(&mut c.api_key, lookup("SLR_CLASSIFIER_API_KEY"));
        }
        if let Some(e) = self.embedding.as_mut() {
            fill(&mut e.api_key, lookup("SLR_EMBEDDING_API_KEY"));
        }
    }

    pub fn layer_order(&self) -> anyhow::Result<Vec<LayerKind>> {
        self.screening
            .layers
            .iter()
            .map(|name| LayerKind::parse(name).ok_or_else(|| anyhow::anyhow!("unknown screening layer: {name}")))
            .collect()
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn pubmed_config(&self) -> PubMedConfig {
        PubMedConfig {
            base_url: self.pubmed.base_url.clone(),
            api_key: self.pubmed.api_key.clone(),
            email: self.pubmed.email.clone().filter(|e| !e.trim().is_empty()),
        }
    }

    pub fn classifier_config(&self) -> Option<ClassifierConfig> {
        self.classifier.as_ref().map(|c| ClassifierConfig {
            base_url: c.base_url.clone(),
            model: c.model.clone(),
            api_key: c.api_key.clone(),
            ..ClassifierConfig::default()
        })
    }

    pub fn embedding_config(&self) -> Option<EmbeddingConfig> {
        self.embedding.as_ref().map(|e| EmbeddingConfig {
            backend: e.backend,
            api_key: e.api_key.clone(),
            model: e.model.clone(),
            base_url: e.base_url.clone(),
            ..EmbeddingConfig::default()
        })
    }

    pub fn run_config(&self) -> anyhow::Result<RunConfig> {
        let s = &self.screening;
        Ok(RunConfig {
            retrieval: RetrievalConfig {
                batch_size: self.pubmed.batch_size.max(1),
                batch_delay_ms: self.pubmed.request_delay_ms,
            },
            dedup: DedupConfig { near_duplicate: self.dedup.enabled, threshold: self.dedup.threshold },
            pipeline: PipelineConfig { concurrency: s.concurrency.max(1), layer_timeout_secs: s.layer_timeout_secs },
            thresholds: Thresholds {
                rule: s.rule_threshold,
                ml: s.ml_threshold,
                semantic: s.semantic_threshold,
                ..Thresholds::default()
            },
            layers: self.layer_order()?,
            exemplars: s.exemplars.clone(),
        })
    }
}

fn fill(slot: &mut Option<String>, value: Option<String>) {
    let empty = slot.as_deref().map(str::trim).map_or(true, str::is_empty);
    if empty {
        *slot = value.filter(|v| !v.trim().is_empty());
    }
}
