//! Axum router — maps all URL paths to handlers.

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::CorsLayer,
    trace::TraceLayer,
    compression::CompressionLayer,
};
use std::sync::Arc;
use crate::state::{AppState, SharedState};
use crate::handlers::{
    jobs::{start_job, job_status, job_results, explain_decision, cancel_job, download_artifact},
    search::pubmed_search,
    system::{health, service_info},
};
use crate::sse::sse_handler;

/// Build and return the full Axum router.
pub fn build_router(state: AppState) -> Router {
    let shared: SharedState = Arc::new(state);

    let api = Router::new()
        .route("/slr/start",                      post(start_job))
        .route("/slr/status/{job_id}",            get(job_status))
        .route("/slr/results/{job_id}",           get(job_results))
        .route("/slr/explain/{job_id}/{identifier}", get(explain_decision))
        .route("/slr/cancel/{job_id}",            post(cancel_job))
        .route("/slr/download/{job_id}/{file}",   get(download_artifact))
        .route("/slr/pubmed/search",              get(pubmed_search));

    Router::new()
        .route("/",       get(service_info))
        .route("/health", get(health))

        // SSE streaming
        .route("/api/events", get(sse_handler))

        .nest("/api/v1", api)

        // Middleware
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(shared)
}
