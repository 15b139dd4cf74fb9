//! Literature source clients.

pub mod pubmed;

pub use slr_common::capability::ArticleSource;
pub use pubmed::{PubMedClient, PubMedConfig};
