//! slr-models — HTTP model backends behind the `Classifier` and `Embedder`
//! capabilities: zero-shot classification and text embeddings.

pub mod backend;
pub mod cache;
pub mod classifier;
pub mod embedding;

use std::sync::Arc;

use slr_common::capability::{Classifier, Embedder};
use slr_common::Result;

pub use backend::ModelError;
pub use cache::CachedEmbedder;
pub use classifier::{ClassifierConfig, HfZeroShotClassifier};
pub use embedding::{EmbeddingBackend, EmbeddingClient, EmbeddingConfig};

/// Build the shared classifier handed to the ML layer.
pub fn build_classifier(cfg: ClassifierConfig) -> Result<Arc<dyn Classifier>> {
    Ok(Arc::new(HfZeroShotClassifier::new(cfg)?))
}

/// Build the shared embedder, with an LRU cache in front when `cache_capacity > 0`.
pub fn build_embedder(cfg: EmbeddingConfig, cache_capacity: usize) -> Result<Arc<dyn Embedder>> {
    let client: Arc<dyn Embedder> = Arc::new(EmbeddingClient::new(cfg)?);
    if cache_capacity == 0 {
        return Ok(client);
    }
    Ok(Arc::new(CachedEmbedder::new(client, cache_capacity)))
}
