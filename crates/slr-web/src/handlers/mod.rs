//! HTTP handlers for all API routes.

pub mod jobs;
pub mod search;
pub mod system;
