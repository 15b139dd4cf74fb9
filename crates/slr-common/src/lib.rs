//! slr-common — Shared types, errors, and capability traits used across all SLR crates.

pub mod error;
pub mod entities;
pub mod decision;
pub mod capability;
pub mod similarity;
pub mod vocabulary;
pub mod sandbox;

// Re-export commonly used types
pub use entities::{Article, Criteria, YearRange};
pub use decision::{
    ArticleDecision, LayerDecision, LayerKind, MetricsSummary, Outcome, PrismaFlow, ScreeningCounts,
};
pub use error::{Result, SlrError};
