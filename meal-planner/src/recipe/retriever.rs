//! Candidate selection for a planning request.

use std::sync::Arc;

use embedding::EmbeddingService;
use rand::seq::SliceRandom;
use storage::{Recipe, RecipeRepository, VectorStore};
use tracing::{info, instrument};

use crate::core::AgentError;

#[derive(Debug, Clone)]
pub struct RetrieverConfig {
    /// Corpora at or below this size skip vector search.
    pub small_pool_threshold: usize,
    pub top_k: usize,
    /// Wider pool offered to the reviewer, so feedback can pull in dishes outside the draft.
    pub feedback_top_k: usize,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            small_pool_threshold: 20,
            top_k: 20,
            feedback_top_k: 40,
        }
    }
}

pub struct RecipeRetriever {
    recipes: Arc<dyn RecipeRepository>,
    vectors: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingService>,
    config: RetrieverConfig,
}

impl RecipeRetriever {
    pub fn new(
        recipes: Arc<dyn RecipeRepository>,
        vectors: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingService>,
        config: RetrieverConfig,
    ) -> Self {
        Self {
            recipes,
            vectors,
            embedder,
            config,
        }
    }

    pub fn recipes(&self) -> &Arc<dyn RecipeRepository> {
        &self.recipes
    }

    /// Candidates for a new plan.
    pub async fn retrieve(&self, request: &str) -> Result<Vec<Recipe>, AgentError> {
        self.retrieve_top(request, self.config.top_k).await
    }

    /// Candidates for revising a plan against `feedback`.
    pub async fn retrieve_for_feedback(&self, feedback: &str) -> Result<Vec<Recipe>, AgentError> {
        self.retrieve_top(feedback, self.config.feedback_top_k).await
    }

    /// Small corpus: all of it, shuffled. Otherwise the `top_k` most similar recipes, best
    /// first. An empty result is [`AgentError::NoCandidates`].
    #[instrument(skip(self, query), fields(query_len = query.len()))]
    async fn retrieve_top(&self, query: &str, top_k: usize) -> Result<Vec<Recipe>, AgentError> {
        let total = self.recipes.count().await?;

        let candidates = if total <= self.config.small_pool_threshold {
            let mut all = self.recipes.list(&[]).await?;
            all.shuffle(&mut rand::rng());
            info!(total, "step: small corpus, using every recipe");
            all
        } else {
            let query_vector = self.embedder.embed(query).await.map_err(AgentError::Embedding)?;
            let hits = self.vectors.find_similar(&query_vector, top_k, &[]).await?;
            let ids: Vec<String> = hits.into_iter().map(|h| h.recipe_id).collect();
            let found = self.recipes.get_by_ids(&ids).await?;
            info!(total, top_k, found = found.len(), "step: similar recipes retrieved");
            found
        };

        if candidates.is_empty() {
            return Err(AgentError::NoCandidates);
        }
        Ok(candidates)
    }
}
