//! PubMed E-utilities client.
//!
//! Endpoints used:
//!   esearch: {base}/esearch.fcgi  (JSON, identifier list)
//!   efetch:  {base}/efetch.fcgi   (XML, full records)

use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use slr_common::sandbox::SandboxClient as Client;
use slr_common::{Article, Result, SlrError};
use tracing::{debug, instrument, warn};

use super::ArticleSource;

pub const DEFAULT_BASE_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";

/// esearch refuses retmax above this.
const ESEARCH_MAX: usize = 10_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PubMedConfig {
    pub base_url: String,
    /// Optional NCBI API key for higher rate limits.
    pub api_key: Option<String>,
    /// Contact address NCBI asks clients to send.
    pub email: Option<String>,
}

impl Default for PubMedConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            email: None,
        }
    }
}

pub struct PubMedClient {
    client: Client,
    cfg: PubMedConfig,
}

impl PubMedClient {
    pub fn new(cfg: PubMedConfig) -> Result<Self> {
        let mut client = Client::new()?;
        client.allow_url(&cfg.base_url);
        Ok(Self { client, cfg })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.cfg.base_url.trim_end_matches('/'), endpoint)
    }

    fn base_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("db", "pubmed".to_string()), ("tool", "slr-screen".to_string())];
        if let Some(key) = &self.cfg.api_key {
            params.push(("api_key", key.clone()));
        }
        if let Some(email) = &self.cfg.email {
            params.push(("email", email.clone()));
        }
        params
    }

    /// Search PubMed and return a list of PMIDs.
    #[instrument(skip(self))]
    async fn esearch(&self, query: &str, max: usize) -> Result<Vec<String>> {
        let mut params = self.base_params();
        params.push(("term", query.to_string()));
        params.push(("retmax", max.min(ESEARCH_MAX).to_string()));
        params.push(("retmode", "json".to_string()));
        params.push(("usehistory", "n".to_string()));

        let resp: serde_json::Value = self.client
            .get(&self.url("esearch.fcgi"))?
            .query(&params)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| SlrError::SourceUnavailable(format!("esearch: {e}")))?
            .json()
            .await
            .map_err(|e| SlrError::SourceUnavailable(format!("esearch response: {e}")))?;

        let ids = parse_esearch(&resp);
        debug!(n = ids.len(), "PubMed esearch returned PMIDs");
        Ok(ids)
    }

    /// Fetch PubMed XML for a list of PMIDs and parse into articles.
    #[instrument(skip(self, pmids), fields(n = pmids.len()))]
    async fn efetch(&self, pmids: &[String]) -> Result<Vec<Article>> {
        if pmids.is_empty() {
            return Ok(vec![]);
        }

        let mut params = self.base_params();
        params.push(("id", pmids.join(",")));
        params.push(("rettype", "abstract".to_string()));
        params.push(("retmode", "xml".to_string()));

        let xml = self.client
            .get(&self.url("efetch.fcgi"))?
            .query(&params)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| SlrError::SourceUnavailable(format!("efetch: {e}")))?
            .text()
            .await
            .map_err(|e| SlrError::SourceUnavailable(format!("efetch response: {e}")))?;

        parse_pubmed_xml(&xml)
    }
}

#[async_trait]
impl ArticleSource for PubMedClient {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<String>> {
        self.esearch(query, max_results).await
    }

    async fn fetch(&self, identifiers: &[String]) -> Result<Vec<Article>> {
        self.efetch(identifiers).await
    }

    fn name(&self) -> &str {
        "pubmed"
    }
}

fn parse_esearch(resp: &serde_json::Value) -> Vec<String> {
    resp["esearchresult"]["idlist"]
        .as_array()
        .map(|ids| ids.iter().filter_map(|v| v.as_str().map(String::from)).collect())
        .unwrap_or_default()
}

/// Collapse runs of whitespace (newlines, indentation) to single spaces.
fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse PubMed XML (efetch abstract mode) into articles.
/// Handles the <PubmedArticleSet><PubmedArticle> structure.
pub fn parse_pubmed_xml(xml: &str) -> Result<Vec<Article>> {
    let mut articles = Vec::new();
    let mut reader = Reader::from_str(xml);
    // Untrimmed so inline markup (<i>, <sub>) keeps its surrounding spacing.
    reader.config_mut().trim_text(false);

    // State machine for XML parsing
    let mut current: Option<Article> = None;
    let mut in_pmid       = false;
    let mut in_title      = false;
    let mut in_abstract   = false;
    let mut in_journal    = false;
    let mut in_journal_title = false;
    let mut in_pub_date   = false;
    let mut in_year       = false;
    let mut in_medline_date = false;
    let mut in_pub_type   = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                match e.name().as_ref() {
                    b"PubmedArticle" => current = Some(Article::new("", "", "")),
                    b"PMID"             => in_pmid = true,
                    b"ArticleTitle"     => in_title = true,
                    b"AbstractText"     => in_abstract = true,
                    b"Journal"          => in_journal = true,
                    b"Title" if in_journal => in_journal_title = true,
                    b"PubDate"          => in_pub_date = true,
                    b"Year" if in_pub_date => in_year = true,
                    b"MedlineDate" if in_pub_date => in_medline_date = true,
                    b"PublicationType"  => in_pub_type = true,
                    _ => {}
                }
            }
            Ok(Event::Text(ref e)) => {
                let text = e.unescape().map(|t| t.into_owned()).unwrap_or_else(|err| {
                    warn!("Undecodable XML text: {}", err);
                    String::new()
                });
                if let Some(a) = current.as_mut() {
                    if in_title     { a.title.push_str(&text); }
                    if in_abstract  { a.abstract_text.push_str(&text); }
                    let text = text.trim();
                    if !text.is_empty() {
                        // The first PMID is the article's own; later ones are citations.
                        if in_pmid && a.identifier.is_empty() { a.identifier = text.to_string(); }
                        if in_journal_title { a.journal = Some(text.to_string()); }
                        if (in_year || in_medline_date) && a.year.is_none() {
                            a.year = text.get(..4).and_then(|y| y.parse().ok());
                        }
                        if in_pub_type  { a.publication_types.push(text.to_string()); }
                    }
                }
            }
            Ok(Event::End(ref e)) => {
                match e.name().as_ref() {
                    b"PMID"         => in_pmid = false,
                    b"ArticleTitle" => in_title = false,
                    b"AbstractText" => {
                        in_abstract = false;
                        if let Some(a) = current.as_mut() { a.abstract_text.push(' '); }
                    }
                    b"Journal"      => in_journal = false,
                    b"Title"        => in_journal_title = false,
                    b"PubDate"      => in_pub_date = false,
                    b"Year"         => in_year = false,
                    b"MedlineDate"  => in_medline_date = false,
                    b"PublicationType" => in_pub_type = false,
                    b"PubmedArticle" => {
                        if let Some(mut a) = current.take() {
                            a.title = collapse_whitespace(&a.title);
                            a.abstract_text = collapse_whitespace(&a.abstract_text);
                            if a.identifier.is_empty() || a.title.is_empty() {
                                warn!(pmid = %a.identifier, "Skipping record without PMID or title");
                            } else {
                                articles.push(a);
                            }
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(SlrError::Xml(format!(
                    "at position {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(articles)
}
