//! Liveness and service info.

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::SharedState;

/// GET /health
pub async fn health(State(state): State<SharedState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "jobs": state.job_count(),
    }))
}

/// GET /
pub async fn service_info(State(state): State<SharedState>) -> Json<Value> {
    let layers: Vec<&str> = state.run_cfg.layers.iter().map(|l| l.as_str()).collect();
    Json(json!({
        "service": "slr-screen",
        "version": env!("CARGO_PKG_VERSION"),
        "source": state.services.source.name(),
        "classifier": state.services.classifier.as_ref().map(|c| c.model_id().to_string()),
        "embedder": state.services.embedder.as_ref().map(|e| e.model_id().to_string()),
        "layers": layers,
        "endpoints": [
            "POST /api/v1/slr/start",
            "GET /api/v1/slr/status/{job_id}",
            "GET /api/v1/slr/results/{job_id}",
            "GET /api/v1/slr/explain/{job_id}/{identifier}",
            "POST /api/v1/slr/cancel/{job_id}",
            "GET /api/v1/slr/download/{job_id}/{file}",
            "GET /api/v1/slr/pubmed/search",
            "GET /api/events",
        ],
    }))
}
