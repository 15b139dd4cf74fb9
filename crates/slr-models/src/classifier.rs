//! Zero-shot classification over the Hugging Face inference API.
//!
//! Request:  POST {base_url}/models/{model}
//!           {"inputs": text, "parameters": {"candidate_labels": [...]}}
//! Response: {"sequence": .., "labels": [..], "scores": [..]}
//!           or, from the newer router, [{"label": .., "score": ..}, ..]

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use slr_common::capability::Classifier;
use slr_common::sandbox::SandboxClient as Client;
use slr_common::Result;
use tracing::{debug, instrument};

use crate::backend::{check_response_status, ModelError};

pub const DEFAULT_BASE_URL: &str = "https://api-inference.huggingface.co";
pub const DEFAULT_MODEL: &str = "facebook/bart-large-mnli";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            timeout_secs: 30,
        }
    }
}

pub struct HfZeroShotClassifier {
    cfg: ClassifierConfig,
    client: Client,
}

impl HfZeroShotClassifier {
    pub fn new(cfg: ClassifierConfig) -> Result<Self> {
        let mut client = Client::with_timeout(Duration::from_secs(cfg.timeout_secs))?;
        client.allow_url(&cfg.base_url);
        Ok(Self { cfg, client })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}", self.cfg.base_url.trim_end_matches('/'), self.cfg.model)
    }

    #[instrument(skip(self, text), fields(model = %self.cfg.model, chars = text.len()))]
    async fn zero_shot(&self, text: &str, labels: &[String]) -> std::result::Result<HashMap<String, f64>, ModelError> {
        let body = serde_json::json!({
            "inputs": text,
            "parameters": { "candidate_labels": labels, "multi_label": false },
        });
        let mut req = self.client.post(&self.endpoint())?.json(&body);
        if let Some(key) = self.cfg.api_key.as_deref().filter(|k| !k.is_empty()) {
            req = req.bearer_auth(key);
        }
        let json = check_response_status(req.send().await?).await?;
        let scores = parse_zero_shot(&json)?;
        debug!(?scores, "Zero-shot scores");
        Ok(scores)
    }
}

#[async_trait]
impl Classifier for HfZeroShotClassifier {
    async fn classify(&self, text: &str, candidate_labels: &[String]) -> Result<HashMap<String, f64>> {
        Ok(self.zero_shot(text, candidate_labels).await?)
    }

    fn model_id(&self) -> &str {
        &self.cfg.model
    }
}

/// Map a zero-shot response to label → score.
pub fn parse_zero_shot(json: &serde_json::Value) -> std::result::Result<HashMap<String, f64>, ModelError> {
    // Some deployments wrap the single result in a one-element array.
    let json = match json.as_array().and_then(|a| a.first()) {
        Some(first) if first.get("labels").is_some() => first,
        _ => json,
    };

    let scores: HashMap<String, f64> = if let (Some(labels), Some(scores)) =
        (json["labels"].as_array(), json["scores"].as_array())
    {
        if labels.len() != scores.len() {
            return Err(ModelError::Malformed(format!(
                "{} labels but {} scores",
                labels.len(),
                scores.len()
            )));
        }
        labels
            .iter()
            .zip(scores)
            .filter_map(|(l, s)| Some((l.as_str()?.to_string(), s.as_f64()?)))
            .collect()
    } else if let Some(items) = json.as_array() {
        items
            .iter()
            .filter_map(|item| Some((item["label"].as_str()?.to_string(), item["score"].as_f64()?)))
            .collect()
    } else {
        HashMap::new()
    };

    if scores.is_empty() {
        return Err(ModelError::Malformed("no label scores in response".to_string()));
    }
    Ok(scores)
}
