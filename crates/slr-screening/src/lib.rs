//! slr-screening — Multi-layer screening cascade, run metrics, CSV export
//! and the job runner tying retrieval to export.

pub mod export;
pub mod layers;
pub mod metrics;
pub mod pipeline;
pub mod run;

pub use export::CsvSink;
pub use layers::{ScreeningLayer, Thresholds};
pub use pipeline::{PipelineConfig, ScreeningPipeline};
pub use run::{run_job, JobFailure, JobRequest, Progress, RunConfig, RunResult, Services};
