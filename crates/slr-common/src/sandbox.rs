use reqwest::{Client, ClientBuilder};
use std::collections::HashSet;
use std::time::Duration;
use url::Url;
use crate::error::SlrError;

/// HTTP client that only talks to approved hosts.
/// Every outbound call (PubMed, model inference) goes through one of these.
#[derive(Debug, Clone)]
pub struct SandboxClient {
    client: Client,
    allowlist: HashSet<String>,
}

const DEFAULT_DOMAINS: &[&str] = &[
    "eutils.ncbi.nlm.nih.gov",       // PubMed E-utilities
    "api-inference.huggingface.co",  // zero-shot inference
    "router.huggingface.co",         // HF inference router
    "api.openai.com",                // embeddings
    "localhost",                     // Ollama / local model servers
    "127.0.0.1",
];

impl SandboxClient {
    /// Client with the default allowlist and a 30 s request timeout.
    pub fn new() -> Result<Self, SlrError> {
        Self::with_timeout(Duration::from_secs(30))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, SlrError> {
        let client = ClientBuilder::new()
            .timeout(timeout)
            .user_agent(concat!("slr-screen/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SlrError::Config(format!("Failed to build HTTP client: {}", e)))?;

        let allowlist = DEFAULT_DOMAINS.iter().map(|d| d.to_string()).collect();
        Ok(Self { client, allowlist })
    }

    /// Allow the host of `url`, e.g. a configured base URL.
    pub fn allow_url(&mut self, url: &str) {
        if let Some(host) = Url::parse(url).ok().and_then(|u| u.host_str().map(String::from)) {
            self.allowlist.insert(host);
        }
    }

    /// Exact match, or a subdomain of an allowed host.
    pub fn is_allowed(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else { return false };
        let Some(host) = parsed.host_str() else { return false };
        self.allowlist
            .iter()
            .any(|allowed| host == allowed || host.ends_with(&format!(".{}", allowed)))
    }

    pub fn get(&self, url: &str) -> Result<reqwest::RequestBuilder, SlrError> {
        self.request(reqwest::Method::GET, url)
    }

    pub fn post(&self, url: &str) -> Result<reqwest::RequestBuilder, SlrError> {
        self.request(reqwest::Method::POST, url)
    }

    pub fn request(&self, method: reqwest::Method, url: &str) -> Result<reqwest::RequestBuilder, SlrError> {
        if !self.is_allowed(url) {
            return Err(SlrError::Security(format!(
                "domain not in allowlist for URL {}",
                url
            )));
        }
        Ok(self.client.request(method, url))
    }
}
