//! slr-web — HTTP surface for the SLR screening service.
//! Provides:
//!   - Job submission, status polling, results and per-article provenance
//!   - Cancellation of running jobs
//!   - Direct PubMed search
//!   - Live progress over Server-Sent Events

pub mod config;
pub mod error;
pub mod router;
pub mod handlers;
pub mod state;
pub mod sse;
