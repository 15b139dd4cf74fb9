//! Embedding client — turns article text into vectors for the semantic
//! layer and the near-duplicate pass.
//!
//! Supports multiple backends:
//!   - OpenAI         (text-embedding-3-small / text-embedding-3-large)
//!   - OpenAI-compat  (any /v1/embeddings endpoint — vLLM, Together, LM Studio)
//!   - Ollama         (nomic-embed-text or any ollama embedding model)

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use slr_common::capability::Embedder;
use slr_common::sandbox::SandboxClient as Client;
use slr_common::Result;
use tracing::instrument;

use crate::backend::{as_vector, check_response_status, ModelError};

const OPENAI_URL: &str = "https://api.openai.com";
const OLLAMA_URL: &str = "http://localhost:11434";

// ── Backend config ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub backend:      EmbeddingBackend,
    pub api_key:      Option<String>,
    pub model:        String,
    pub base_url:     Option<String>,  // for compat/ollama
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingBackend {
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "openai_compatible")]
    OpenAiCompatible,
    Ollama,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend:      EmbeddingBackend::Ollama,
            api_key:      None,
            model:        "nomic-embed-text".to_string(),
            base_url:     None,
            timeout_secs: 30,
        }
    }
}

impl EmbeddingConfig {
    fn base_url(&self) -> &str {
        let default = match self.backend {
            EmbeddingBackend::OpenAi => OPENAI_URL,
            EmbeddingBackend::OpenAiCompatible | EmbeddingBackend::Ollama => OLLAMA_URL,
        };
        self.base_url.as_deref().unwrap_or(default).trim_end_matches('/')
    }
}

// ── Embedding client ──────────────────────────────────────────────────────────

pub struct EmbeddingClient {
    cfg:    EmbeddingConfig,
    client: Client,
}

impl EmbeddingClient {
    pub fn new(cfg: EmbeddingConfig) -> Result<Self> {
        let mut client = Client::with_timeout(Duration::from_secs(cfg.timeout_secs))?;
        client.allow_url(cfg.base_url());
        Ok(Self { cfg, client })
    }

    /// URL the configured backend is called at.
    pub fn endpoint(&self) -> String {
        match self.cfg.backend {
            EmbeddingBackend::OpenAi | EmbeddingBackend::OpenAiCompatible => {
                format!("{}/v1/embeddings", self.cfg.base_url())
            }
            EmbeddingBackend::Ollama => format!("{}/api/embeddings", self.cfg.base_url()),
        }
    }

    #[instrument(skip(self, text), fields(backend = ?self.cfg.backend, chars = text.len()))]
    async fn embed_one(&self, text: &str) -> std::result::Result<Vec<f32>, ModelError> {
        let body = match self.cfg.backend {
            EmbeddingBackend::OpenAi | EmbeddingBackend::OpenAiCompatible => {
                serde_json::json!({ "model": &self.cfg.model, "input": [text] })
            }
            EmbeddingBackend::Ollama => serde_json::json!({ "model": &self.cfg.model, "prompt": text }),
        };

        let mut req = self.client.post(&self.endpoint())?.json(&body);
        if let Some(key) = self.cfg.api_key.as_deref().filter(|k| !k.is_empty()) {
            req = req.bearer_auth(key);
        }
        let resp = check_response_status(req.send().await?).await?;

        let vector = match self.cfg.backend {
            EmbeddingBackend::OpenAi | EmbeddingBackend::OpenAiCompatible => {
                parse_openai_embeddings(&resp)?.into_iter().next()
            }
            EmbeddingBackend::Ollama => as_vector(&resp["embedding"]),
        };
        match vector {
            Some(v) if !v.is_empty() => Ok(v),
            _ => Err(ModelError::Malformed("response carried no embedding".to_string())),
        }
    }
}

#[async_trait]
impl Embedder for EmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_one(text).await?)
    }

    fn model_id(&self) -> &str {
        &self.cfg.model
    }
}

/// `data[].embedding`, reordered by `index` when the server provides one.
fn parse_openai_embeddings(resp: &serde_json::Value) -> std::result::Result<Vec<Vec<f32>>, ModelError> {
    let data = resp["data"]
        .as_array()
        .ok_or_else(|| ModelError::Malformed("missing `data` array".to_string()))?;

    let mut rows: Vec<(u64, Vec<f32>)> = data
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let vector = as_vector(&item["embedding"])
                .ok_or_else(|| ModelError::Malformed(format!("data[{i}].embedding is not a vector")))?;
            Ok((item["index"].as_u64().unwrap_or(i as u64), vector))
        })
        .collect::<std::result::Result<_, ModelError>>()?;
    rows.sort_by_key(|(index, _)| *index);
    Ok(rows.into_iter().map(|(_, v)| v).collect())
}
