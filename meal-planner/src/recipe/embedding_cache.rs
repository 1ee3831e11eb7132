//! Content-addressed embedding cache: a recipe is only re-embedded when the text it would be
//! embedded from has changed.

use std::sync::Arc;
use std::time::Instant;

use embedding::EmbeddingService;
use llm_client::{AgentMeta, TokenUsage};
use sha2::{Digest, Sha256};
use storage::{EmbeddingRecord, Recipe, VectorStore};
use tracing::{debug, instrument};

use crate::core::AgentError;

pub const EMBEDDING_AGENT: &str = "Embedding";

/// The text a recipe is embedded from.
pub fn canonical_text(recipe: &Recipe) -> String {
    format!(
        "Title: {}\nTags: {}\nIngredients: {}\nPrep Time: {}",
        recipe.title,
        recipe.tags.join(", "),
        recipe.ingredients.join(", "),
        recipe.prep_time
    )
}

/// Lower-case hex SHA-256.
pub fn content_hash(text: &str) -> String {
    format!("{:x}", Sha256::digest(text.as_bytes()))
}

/// Outcome of the cache decision, not yet written.
#[derive(Debug, Clone)]
pub struct PreparedEmbedding {
    pub record: EmbeddingRecord,
    pub meta: AgentMeta,
    pub cache_hit: bool,
}

pub struct EmbeddingCache {
    vectors: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingService>,
    model: String,
}

impl EmbeddingCache {
    pub fn new(vectors: Arc<dyn VectorStore>, embedder: Arc<dyn EmbeddingService>, model: impl Into<String>) -> Self {
        Self {
            vectors,
            embedder,
            model: model.into(),
        }
    }

    /// Reuses the stored vector when its hash matches the recipe's current text; otherwise calls
    /// the provider. Prompt tokens on a miss are approximated by the text's character count.
    #[instrument(skip(self, recipe), fields(recipe_id = %recipe.id))]
    pub async fn prepare_embedding(&self, recipe: &Recipe) -> Result<PreparedEmbedding, AgentError> {
        let text = canonical_text(recipe);
        let hash = content_hash(&text);

        if let Some(existing) = self.vectors.get(&recipe.id).await? {
            if existing.content_hash == hash {
                debug!("step: embedding cache hit");
                return Ok(PreparedEmbedding {
                    record: existing,
                    meta: AgentMeta::free(EMBEDDING_AGENT),
                    cache_hit: true,
                });
            }
        }

        let started = Instant::now();
        let vector = self.embedder.embed(&text).await.map_err(AgentError::Embedding)?;
        let prompt_tokens = u32::try_from(text.chars().count()).unwrap_or(u32::MAX);
        let meta = AgentMeta::new(
            EMBEDDING_AGENT,
            TokenUsage::new(self.model.clone(), prompt_tokens, 0),
            started.elapsed(),
        );
        debug!(dimensions = vector.len(), "step: embedding cache miss, vector generated");

        Ok(PreparedEmbedding {
            record: EmbeddingRecord::new(recipe.id.clone(), vector, hash),
            meta,
            cache_hit: false,
        })
    }

    /// [`prepare_embedding`](Self::prepare_embedding) followed by an upsert with the current hash.
    pub async fn process_and_save_embedding(&self, recipe: &Recipe) -> Result<(Vec<f32>, AgentMeta), AgentError> {
        let prepared = self.prepare_embedding(recipe).await?;
        self.vectors.save(&prepared.record).await?;
        Ok((prepared.record.vector, prepared.meta))
    }
}
