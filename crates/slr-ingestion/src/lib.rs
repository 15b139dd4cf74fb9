//! slr-ingestion — Article retrieval and deduplication.
//! Covers the front half of a screening run:
//! - PubMed query construction from screening criteria
//! - Identifier search and batched record fetch (PubMed E-utilities)
//! - Absorbing source outages without aborting the run
//! - Exact and near-duplicate removal

pub mod sources;
pub mod query;
pub mod pipeline;
pub mod dedup;
