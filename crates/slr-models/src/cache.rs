//! In-memory LRU cache in front of an embedder.
//!
//! The near-duplicate pass and the semantic layer both embed the same
//! title+abstract text, so wrapping the shared embedder halves the calls
//! made during one run.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use lru::LruCache;
use slr_common::capability::Embedder;
use slr_common::Result;
use tracing::trace;

pub const DEFAULT_CAPACITY: usize = 4096;

pub struct CachedEmbedder {
    inner: Arc<dyn Embedder>,
    cache: Mutex<LruCache<String, Vec<f32>>>,
}

impl CachedEmbedder {
    pub fn new(inner: Arc<dyn Embedder>, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self { inner, cache: Mutex::new(LruCache::new(capacity)) }
    }

    pub fn len(&self) -> usize {
        self.cache.lock().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Embedder for CachedEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        // A poisoned lock only costs a cache miss.
        if let Some(hit) = self.cache.lock().ok().and_then(|mut c| c.get(text).cloned()) {
            trace!("Embedding cache hit");
            return Ok(hit);
        }
        let vector = self.inner.embed(text).await?;
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(text.to_string(), vector.clone());
        }
        Ok(vector)
    }

    fn model_id(&self) -> &str {
        self.inner.model_id()
    }
}
