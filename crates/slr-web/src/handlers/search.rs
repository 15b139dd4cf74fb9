//! Direct PubMed search, outside any screening job.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use slr_common::Article;
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::state::SharedState;

const DEFAULT_LIMIT: usize = 20;
const MAX_LIMIT: usize = 200;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub query: String,
    pub max_results: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub source: String,
    /// Identifiers returned by the search step.
    pub identifiers: Vec<String>,
    pub articles: Vec<Article>,
}

/// GET /api/v1/slr/pubmed/search?query=&max_results=
pub async fn pubmed_search(
    State(state): State<SharedState>,
    Query(params): Query<SearchQuery>,
) -> ApiResult<Json<SearchResponse>> {
    let query = params.query.trim();
    if query.is_empty() {
        return Err(ApiError::BadRequest("query must not be empty".to_string()));
    }
    let limit = params.max_results.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

    let source = &state.services.source;
    let identifiers = source.search(query, limit).await?;
    let articles = if identifiers.is_empty() { Vec::new() } else { source.fetch(&identifiers).await? };
    debug!(query, hits = identifiers.len(), fetched = articles.len(), "Direct search");

    Ok(Json(SearchResponse {
        query: query.to_string(),
        source: source.name().to_string(),
        identifiers,
        articles,
    }))
}
