//! Blog → recipe corpus ingestion.

use std::sync::Arc;

use llm_client::AgentMeta;
use storage::{Recipe, RecipeRepository};
use tracing::{error, info, instrument};

use crate::core::AgentError;
use crate::ghost::BlogPost;
use crate::metrics::MetricsRecorder;
use crate::recipe::{EmbeddingCache, RecipeExtractor, EXTRACTOR_AGENT};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Posts extracted by the model.
    pub processed: usize,
    /// Posts whose stored recipe was reused unchanged.
    pub reused: usize,
    pub failed: usize,
}

pub struct RecipeIngestor {
    extractor: RecipeExtractor,
    embeddings: EmbeddingCache,
    recipes: Arc<dyn RecipeRepository>,
    metrics: MetricsRecorder,
}

impl RecipeIngestor {
    pub fn new(
        extractor: RecipeExtractor,
        embeddings: EmbeddingCache,
        recipes: Arc<dyn RecipeRepository>,
        metrics: MetricsRecorder,
    ) -> Self {
        Self {
            extractor,
            embeddings,
            recipes,
            metrics,
        }
    }

    /// Ingests every post; one failed post is logged and counted, the rest continue.
    #[instrument(skip(self, posts), fields(posts = posts.len()))]
    pub async fn ingest_posts(&self, posts: &[BlogPost], skip_unchanged: bool) -> IngestReport {
        let mut report = IngestReport::default();
        for post in posts {
            match self.ingest_post(post, skip_unchanged).await {
                Ok(true) => report.reused += 1,
                Ok(false) => report.processed += 1,
                Err(e) => {
                    if let Some(meta) = e.meta() {
                        self.metrics.record_meta(meta).await;
                    }
                    error!(post_id = %post.id, title = %post.title, error = %e, "Failed to ingest post");
                    report.failed += 1;
                }
            }
        }
        info!(
            processed = report.processed,
            reused = report.reused,
            failed = report.failed,
            "step: ingestion finished"
        );
        report
    }

    /// Returns whether the stored recipe was reused.
    async fn ingest_post(&self, post: &BlogPost, skip_unchanged: bool) -> Result<bool, AgentError> {
        let (recipe, extract_meta, reused) = match self.unchanged_recipe(post, skip_unchanged).await? {
            Some(stored) => (stored, AgentMeta::free(EXTRACTOR_AGENT), true),
            None => {
                let (recipe, meta) = self.extractor.extract_recipe(post).await?;
                (recipe, meta, false)
            }
        };

        let cache_hit = self.store(&recipe, extract_meta).await?;
        info!(
            post_id = %post.id,
            reused,
            embedding_cache_hit = cache_hit,
            "step: post ingested"
        );
        Ok(reused)
    }

    pub async fn extract(&self, post: &BlogPost) -> Result<(Recipe, AgentMeta), AgentError> {
        self.extractor.extract_recipe(post).await
    }

    /// Embeds and saves `recipe`, then records `extract_meta` with the embedding usage. Returns
    /// whether the embedding came from the cache.
    pub async fn store(&self, recipe: &Recipe, extract_meta: AgentMeta) -> Result<bool, AgentError> {
        let prepared = self.embeddings.prepare_embedding(recipe).await?;
        self.recipes
            .save_with_embedding(recipe, &prepared.record)
            .await?;
        self.metrics
            .record_all(&[extract_meta, prepared.meta])
            .await;
        Ok(prepared.cache_hit)
    }

    async fn unchanged_recipe(&self, post: &BlogPost, skip_unchanged: bool) -> Result<Option<Recipe>, AgentError> {
        if !skip_unchanged || post.updated_at.is_none() {
            return Ok(None);
        }
        Ok(self
            .recipes
            .get(&post.id)
            .await?
            .filter(|stored| stored.source_updated_at == post.updated_at))
    }
}
