//! # Text Embeddings
//!
//! Embedding service interface used by the recipe embedding cache and the retriever.

use async_trait::async_trait;

mod config;
pub use config::EnvEmbeddingConfig;

/// Service for generating text embeddings.
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    /// Generates an embedding vector for a single text string.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, anyhow::Error>;
}
