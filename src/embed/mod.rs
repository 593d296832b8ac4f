//! Text embedding
//!
//! The [`Embedder`] trait hides the encoder. The index and every query must
//! go through the same embedder; mixing models is not detected.

#[cfg(feature = "local-embed")]
mod fastembed_impl;

#[cfg(feature = "local-embed")]
pub use fastembed_impl::FastEmbedder;

use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};
use crate::progress::progress_bar;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Trait for embedding providers
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts, one vector per text, in order
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>>;

    /// Get the embedding dimension
    fn dimension(&self) -> usize;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// Create an embedder based on configuration
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    #[cfg(feature = "local-embed")]
    {
        Ok(Arc::new(FastEmbedder::new(config)?))
    }
    #[cfg(not(feature = "local-embed"))]
    {
        Err(Error::Embedding(format!(
            "cannot load '{}': built without the local-embed feature",
            config.model
        )))
    }
}

/// Embedder created on first use and shared afterwards.
///
/// Model construction may download weights, so it runs on a blocking thread.
pub struct LazyEmbedder {
    config: EmbeddingConfig,
    cell: OnceCell<Arc<dyn Embedder>>,
}

impl LazyEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Self {
        Self {
            config: config.clone(),
            cell: OnceCell::new(),
        }
    }

    /// Wrap an embedder that already exists
    pub fn ready(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            config: EmbeddingConfig {
                model: embedder.model_name().to_string(),
                ..EmbeddingConfig::default()
            },
            cell: OnceCell::new_with(Some(embedder)),
        }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    pub async fn get(&self) -> Result<Arc<dyn Embedder>> {
        self.cell
            .get_or_try_init(|| async {
                let config = self.config.clone();
                tokio::task::spawn_blocking(move || create_embedder(&config))
                    .await
                    .map_err(|e| Error::Embedding(format!("Task join error: {}", e)))?
            })
            .await
            .cloned()
    }
}

/// Embed a single query string
pub async fn embed_query(embedder: &dyn Embedder, query: &str) -> Result<Vec<f32>> {
    embedder
        .embed(vec![query.to_string()])
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| Error::Embedding("No embedding returned".to_string()))
}

/// Embed in batches with a progress bar
pub async fn embed_in_batches(
    embedder: &dyn Embedder,
    texts: Vec<String>,
    batch_size: usize,
) -> Result<Vec<Vec<f32>>> {
    let mut all_embeddings = Vec::with_capacity(texts.len());
    let pb = progress_bar(texts.len() as u64, "embedding");

    for batch in texts.chunks(batch_size.max(1)) {
        let embeddings = embedder.embed(batch.to_vec()).await?;
        all_embeddings.extend(embeddings);
        pb.inc(batch.len() as u64);
    }

    pb.finish_and_clear();
    Ok(all_embeddings)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Deterministic bag-of-words embedder: each lowercase word is hashed
    /// into one of `dimension` buckets.
    pub struct HashEmbedder {
        dimension: usize,
    }

    impl HashEmbedder {
        pub fn new(dimension: usize) -> Self {
            Self { dimension }
        }

        pub fn vector(&self, text: &str) -> Vec<f32> {
            let mut v = vec![0.0; self.dimension];
            for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
                let hash = blake3::hash(word.to_lowercase().as_bytes());
                let bucket = hash.as_bytes()[0] as usize % self.dimension;
                v[bucket] += 1.0;
            }
            v
        }
    }

    #[async_trait]
    impl Embedder for HashEmbedder {
        async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|t| self.vector(t)).collect())
        }

        fn dimension(&self) -> usize {
            self.dimension
        }

        fn model_name(&self) -> &str {
            "hash"
        }
    }

    /// Embedder that always fails.
    pub struct BrokenEmbedder;

    #[async_trait]
    impl Embedder for BrokenEmbedder {
        async fn embed(&self, _texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
            Err(Error::Embedding("encoder offline".to_string()))
        }

        fn dimension(&self) -> usize {
            4
        }

        fn model_name(&self) -> &str {
            "broken"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[tokio::test]
    async fn test_embed_in_batches_preserves_order() {
        let embedder = HashEmbedder::new(16);
        let texts: Vec<String> = (0..10).map(|i| format!("text {}", i)).collect();

        let batched = embed_in_batches(&embedder, texts.clone(), 3).await.unwrap();
        let direct = embedder.embed(texts).await.unwrap();
        assert_eq!(batched, direct);
    }

    #[tokio::test]
    async fn test_embed_query() {
        let embedder = HashEmbedder::new(16);
        let v = embed_query(&embedder, "stall speed").await.unwrap();
        assert_eq!(v.len(), 16);
        assert_eq!(v.iter().sum::<f32>(), 2.0);

        assert!(embed_query(&BrokenEmbedder, "x").await.is_err());
    }

    #[tokio::test]
    async fn test_lazy_embedder_ready() {
        let lazy = LazyEmbedder::ready(Arc::new(HashEmbedder::new(8)));
        assert_eq!(lazy.model(), "hash");
        let first = lazy.get().await.unwrap();
        let second = lazy.get().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.dimension(), 8);
    }
}
