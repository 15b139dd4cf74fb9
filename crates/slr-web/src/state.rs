//! Shared application state for the web server.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use slr_common::MetricsSummary;
use slr_screening::{JobFailure, JobRequest, Progress, RunConfig, RunResult, Services};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub const DEFAULT_MAX_FINISHED_JOBS: usize = 500;

/// Events pushed to connected clients via SSE.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppEvent {
    /// A job changed lifecycle state
    JobStatus { job_id: String, status: JobStatus, message: Option<String> },
    /// A running job advanced
    JobProgress { job_id: String, progress: Progress },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Running => "RUNNING",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// Counts shown while polling. Filled in as progress arrives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct JobCounts {
    pub total_fetched: usize,
    pub after_dedup: usize,
    pub screened: usize,
    pub included: usize,
    pub excluded: usize,
}

#[derive(Debug, Clone)]
pub struct JobRecord {
    pub job_id: String,
    pub status: JobStatus,
    pub request: JobRequest,
    pub cancel: CancellationToken,
    pub counts: JobCounts,
    /// Final result, or the partial one kept from a failed run.
    pub result: Option<RunResult>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobRecord {
    fn new(job_id: String, request: JobRequest) -> Self {
        let now = Utc::now();
        Self {
            job_id,
            status: JobStatus::Pending,
            request,
            cancel: CancellationToken::new(),
            counts: JobCounts::default(),
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn warnings(&self) -> &[String] {
        self.result.as_ref().map(|r| r.warnings.as_slice()).unwrap_or(&[])
    }

    /// Metrics are only reported for completed jobs.
    pub fn metrics(&self) -> Option<MetricsSummary> {
        match self.status {
            JobStatus::Completed => self.result.as_ref().and_then(|r| r.metrics),
            _ => None,
        }
    }
}

/// Shared state injected into every Axum handler.
pub struct AppState {
    pub services: Services,
    pub run_cfg: RunConfig,
    jobs: RwLock<HashMap<String, JobRecord>>,
    /// Where the result sink writes `<job_id>/<file>`.
    output_dir: PathBuf,
    max_finished_jobs: usize,
    /// Broadcast channel for SSE push events
    pub event_tx: broadcast::Sender<AppEvent>,
}

impl AppState {
    pub fn new(services: Services, run_cfg: RunConfig) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self {
            services,
            run_cfg,
            jobs: RwLock::new(HashMap::new()),
            output_dir: PathBuf::from("./output"),
            max_finished_jobs: DEFAULT_MAX_FINISHED_JOBS,
            event_tx,
        }
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_job_retention(mut self, max_finished_jobs: usize) -> Self {
        self.max_finished_jobs = max_finished_jobs;
        self
    }

    pub fn artifact_path(&self, job_id: &str, file: &str) -> PathBuf {
        self.output_dir.join(job_id).join(file)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.event_tx.subscribe()
    }

    /// Send to SSE subscribers; having none is fine.
    pub fn notify(&self, event: AppEvent) {
        let _ = self.event_tx.send(event);
    }

    pub fn create_job(&self, job_id: &str, request: JobRequest) -> JobRecord {
        let record = JobRecord::new(job_id.to_string(), request);
        self.jobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(job_id.to_string(), record.clone());
        record
    }

    pub fn job(&self, job_id: &str) -> Option<JobRecord> {
        self.jobs.read().unwrap_or_else(PoisonError::into_inner).get(job_id).cloned()
    }

    pub fn job_count(&self) -> usize {
        self.jobs.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn update(&self, job_id: &str, f: impl FnOnce(&mut JobRecord)) {
        let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(record) = jobs.get_mut(job_id) {
            f(record);
            record.updated_at = Utc::now();
        }
    }

    pub fn mark_running(&self, job_id: &str) {
        self.update(job_id, |r| r.status = JobStatus::Running);
        self.notify(AppEvent::JobStatus { job_id: job_id.to_string(), status: JobStatus::Running, message: None });
    }

    pub fn record_progress(&self, job_id: &str, progress: Progress) {
        self.update(job_id, |r| match &progress {
            Progress::Retrieved { fetched, .. } => r.counts.total_fetched = *fetched,
            Progress::Deduplicated { kept, .. } => r.counts.after_dedup = *kept,
            Progress::Screening { done, .. } => r.counts.screened = *done,
            Progress::Exported { .. } => {}
        });
        self.notify(AppEvent::JobProgress { job_id: job_id.to_string(), progress });
    }

    /// Store the outcome of `run_job` and move the job to a terminal state.
    pub fn finish(&self, job_id: &str, outcome: Result<RunResult, JobFailure>) {
        let (status, result, error) = match outcome {
            Ok(result) => (JobStatus::Completed, result, None),
            Err(failure) => (JobStatus::Failed, *failure.partial, Some(failure.error.to_string())),
        };
        info!(job_id, status = status.as_str(), decisions = result.decisions.len(), "Job finished");

        let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(r) = jobs.get_mut(job_id) {
            r.status = status;
            r.counts = JobCounts {
                total_fetched: result.total_fetched,
                after_dedup: result.after_dedup,
                screened: result.counts.total,
                included: result.counts.included,
                excluded: result.counts.excluded,
            };
            r.error = error.clone();
            r.result = Some(result);
            r.updated_at = Utc::now();
        }
        prune_finished(&mut jobs, self.max_finished_jobs);
        drop(jobs);
        self.notify(AppEvent::JobStatus { job_id: job_id.to_string(), status, message: error });
    }
}

/// Drop the least recently finished records until at most `keep` remain.
/// Pending and running jobs are never dropped.
fn prune_finished(jobs: &mut HashMap<String, JobRecord>, keep: usize) {
    let mut finished: Vec<(DateTime<Utc>, String)> = jobs
        .values()
        .filter(|r| r.status.is_terminal())
        .map(|r| (r.updated_at, r.job_id.clone()))
        .collect();
    if finished.len() <= keep {
        return;
    }
    let excess = finished.len() - keep;
    finished.sort();
    for (_, job_id) in finished.into_iter().take(excess) {
        jobs.remove(&job_id);
        debug!(%job_id, "Finished job evicted");
    }
}

pub type SharedState = Arc<AppState>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_upper_case() {
        assert_eq!(serde_json::to_value(JobStatus::Completed).unwrap(), "COMPLETED");
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
    }

    fn record(job_id: &str, status: JobStatus, minutes_ago: i64) -> (String, JobRecord) {
        let mut r = JobRecord::new(job_id.to_string(), JobRequest::new(slr_common::Criteria::for_disease("PCOS")));
        r.status = status;
        r.updated_at = Utc::now() - chrono::Duration::minutes(minutes_ago);
        (job_id.to_string(), r)
    }

    #[test]
    fn test_oldest_finished_jobs_are_evicted() {
        let mut jobs: HashMap<String, JobRecord> = [
            record("old-done", JobStatus::Completed, 30),
            record("old-failed", JobStatus::Failed, 20),
            record("running", JobStatus::Running, 60),
            record("pending", JobStatus::Pending, 90),
            record("new-done", JobStatus::Completed, 1),
        ]
        .into_iter()
        .collect();

        prune_finished(&mut jobs, 1);

        let mut kept: Vec<&str> = jobs.keys().map(String::as_str).collect();
        kept.sort();
        assert_eq!(kept, vec!["new-done", "pending", "running"]);
    }

    #[test]
    fn test_prune_is_noop_under_cap() {
        let mut jobs: HashMap<String, JobRecord> =
            [record("a", JobStatus::Completed, 5), record("b", JobStatus::Failed, 3)].into_iter().collect();
        prune_finished(&mut jobs, DEFAULT_MAX_FINISHED_JOBS);
        assert_eq!(jobs.len(), 2);
    }

    #[test]
    fn test_progress_event_shape() {
        let event = AppEvent::JobProgress {
            job_id: "j1".into(),
            progress: Progress::Screening { done: 5, total: 10 },
        };
        let v = serde_json::to_value(event).unwrap();
        assert_eq!(v["type"], "job_progress");
        assert_eq!(v["progress"]["stage"], "screening");
        assert_eq!(v["progress"]["done"], 5);
    }
}
