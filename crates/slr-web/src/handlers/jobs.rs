//! Screening job lifecycle: submit, poll, fetch results, explain, cancel, download.

use std::collections::BTreeMap;

use axum::{
    body::Body,
    extract::{Path, Request, State},
    http::StatusCode,
    response::Response,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use slr_common::{ArticleDecision, LayerDecision, LayerKind, MetricsSummary, Outcome};
use slr_screening::export::ARTIFACT_FILES;
use slr_screening::{run_job, JobRequest, Progress, RunResult};
use tower_http::services::ServeFile;
use tracing::info;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::state::{AppEvent, JobCounts, JobRecord, JobStatus, SharedState};

// ── Responses ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct StartResponse {
    pub job_id: String,
    pub status: JobStatus,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub job_id: String,
    pub status: JobStatus,
    pub error: Option<String>,
    pub warnings: Vec<String>,
    pub counts: JobCounts,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<MetricsSummary>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&JobRecord> for StatusResponse {
    fn from(r: &JobRecord) -> Self {
        Self {
            job_id: r.job_id.clone(),
            status: r.status,
            error: r.error.clone(),
            warnings: r.warnings().to_vec(),
            counts: r.counts,
            metrics: r.metrics(),
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ResultsResponse {
    #[serde(flatten)]
    pub result: RunResult,
    /// Exported file name to its download path.
    pub download_urls: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
pub struct ExplainResponse {
    pub job_id: String,
    pub identifier: String,
    pub title: String,
    pub final_outcome: Outcome,
    pub final_layer: LayerKind,
    pub final_confidence: f64,
    pub disease_match: Option<bool>,
    /// Every layer that ran, in cascade order.
    pub decisions: Vec<LayerDecision>,
}

impl ExplainResponse {
    fn new(job_id: &str, d: &ArticleDecision) -> Self {
        Self {
            job_id: job_id.to_string(),
            identifier: d.article.identifier.clone(),
            title: d.article.title.clone(),
            final_outcome: d.final_outcome,
            final_layer: d.final_layer,
            final_confidence: d.final_confidence(),
            disease_match: d.disease_match(),
            decisions: d.decisions.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub job_id: String,
    pub status: JobStatus,
    pub cancelled: bool,
}

// ── Handlers ──────────────────────────────────────────────────────────────────

/// POST /api/v1/slr/start
pub async fn start_job(
    State(state): State<SharedState>,
    Json(request): Json<JobRequest>,
) -> ApiResult<(StatusCode, Json<StartResponse>)> {
    request.criteria.validate()?;

    let job_id = Uuid::new_v4().to_string();
    let record = state.create_job(&job_id, request);
    info!(%job_id, disease = %record.request.criteria.disease, "Job accepted");
    state.notify(AppEvent::JobStatus { job_id: job_id.clone(), status: JobStatus::Pending, message: None });

    // Run in a background task so the submitter can poll.
    let task_state = state.clone();
    let task_id = job_id.clone();
    tokio::spawn(async move {
        task_state.mark_running(&task_id);
        let progress = |p: Progress| task_state.record_progress(&task_id, p);
        let outcome = run_job(
            &task_id,
            &record.request,
            &task_state.services,
            &task_state.run_cfg,
            &record.cancel,
            &progress,
        )
        .await;
        task_state.finish(&task_id, outcome);
    });

    Ok((StatusCode::ACCEPTED, Json(StartResponse { job_id, status: JobStatus::Pending })))
}

/// GET /api/v1/slr/status/{job_id}
pub async fn job_status(
    State(state): State<SharedState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<StatusResponse>> {
    let record = find(&state, &job_id)?;
    Ok(Json(StatusResponse::from(&record)))
}

/// GET /api/v1/slr/results/{job_id}
pub async fn job_results(
    State(state): State<SharedState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<ResultsResponse>> {
    let record = find(&state, &job_id)?;
    let result = match (record.status, record.result) {
        (JobStatus::Completed, Some(result)) => result,
        (status, _) => {
            return Err(ApiError::Conflict(format!("job {job_id} is {}, results need COMPLETED", status.as_str())))
        }
    };

    let mut download_urls = BTreeMap::new();
    for file in ARTIFACT_FILES {
        if tokio::fs::try_exists(state.artifact_path(&job_id, file)).await.unwrap_or(false) {
            download_urls.insert(file.to_string(), format!("/api/v1/slr/download/{job_id}/{file}"));
        }
    }
    Ok(Json(ResultsResponse { result, download_urls }))
}

/// GET /api/v1/slr/download/{job_id}/{file}
///
/// Serves one exported file of a completed job.
pub async fn download_artifact(
    State(state): State<SharedState>,
    Path((job_id, file)): Path<(String, String)>,
    request: Request,
) -> ApiResult<Response> {
    if !ARTIFACT_FILES.contains(&file.as_str()) {
        return Err(ApiError::NotFound(format!("export file {file}")));
    }
    let record = find(&state, &job_id)?;
    if record.status != JobStatus::Completed {
        return Err(ApiError::Conflict(format!("job {job_id} is {}, downloads need COMPLETED", record.status.as_str())));
    }

    let response = ServeFile::new(state.artifact_path(&job_id, &file))
        .try_call(request)
        .await
        .map_err(|e| ApiError::Internal(format!("reading {file}: {e}")))?;
    if response.status() == StatusCode::NOT_FOUND {
        return Err(ApiError::NotFound(format!("{file} for job {job_id}")));
    }
    Ok(response.map(Body::new))
}

/// GET /api/v1/slr/explain/{job_id}/{identifier}
///
/// Works for failed jobs too, as long as the article was screened.
pub async fn explain_decision(
    State(state): State<SharedState>,
    Path((job_id, identifier)): Path<(String, String)>,
) -> ApiResult<Json<ExplainResponse>> {
    let record = find(&state, &job_id)?;
    let result = record
        .result
        .as_ref()
        .ok_or_else(|| ApiError::Conflict(format!("job {job_id} has no decisions yet")))?;
    let decision = result
        .decision_for(&identifier)
        .ok_or_else(|| ApiError::NotFound(format!("article {identifier} in job {job_id}")))?;
    Ok(Json(ExplainResponse::new(&job_id, decision)))
}

/// POST /api/v1/slr/cancel/{job_id}
pub async fn cancel_job(
    State(state): State<SharedState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<CancelResponse>> {
    let record = find(&state, &job_id)?;
    if record.status.is_terminal() {
        return Err(ApiError::Conflict(format!("job {job_id} already {}", record.status.as_str())));
    }
    record.cancel.cancel();
    info!(%job_id, "Cancellation requested");
    Ok(Json(CancelResponse { job_id, status: record.status, cancelled: true }))
}

fn find(state: &SharedState, job_id: &str) -> ApiResult<JobRecord> {
    state.job(job_id).ok_or_else(|| ApiError::NotFound(format!("job {job_id}")))
}
