//! Wiring: builds repositories, provider clients and services from [`AppConfig`]. Everything is
//! constructor-injected behind the storage and provider traits.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use embedding::EmbeddingService;
use llm_client::{mask_token, ChatCompletionsClient, EnvLlmConfig, TextGenerator};
use openai_embedding::OpenAIEmbedding;
use storage::{
    PlanRepository, RecipeRepository, SqliteMetricsStore, SqlitePlanRepository, SqlitePoolManager,
    SqliteRecipeRepository, SqliteSessionRepository, SqliteVectorStore, VectorStore,
};
use tracing::{error, info, instrument};

use crate::bot::{BotSettings, ConversationHandler};
use crate::config::AppConfig;
use crate::core::ChatTransport;
use crate::clipper::RecipeClipper;
use crate::ghost::{GhostClient, GhostPublisher};
use crate::ingestion::RecipeIngestor;
use crate::lifecycle::PlanLifecycle;
use crate::metrics::MetricsRecorder;
use crate::planner::{Analyst, Chef, PlanReviewer, Planner, ShoppingListGenerator};
use crate::recipe::{EmbeddingCache, RecipeExtractor, RecipeRetriever, RetrieverConfig};
use crate::session::AdjustmentSessions;

pub struct AppComponents {
    pub recipes: Arc<dyn RecipeRepository>,
    pub vectors: Arc<dyn VectorStore>,
    pub embedder: Arc<dyn EmbeddingService>,
    pub metrics: MetricsRecorder,
    pub sessions: Arc<AdjustmentSessions>,
    pub planner: Arc<Planner>,
    pub lifecycle: Arc<PlanLifecycle>,
}

fn text_generator(llm: &EnvLlmConfig, model: &str) -> Result<Arc<dyn TextGenerator>> {
    let client = ChatCompletionsClient::new(llm.api_key.clone(), llm.base_url.clone(), model)
        .with_context(|| format!("Failed to build text-generation client for {}", model))?
        .with_retry_policy(llm.retry_policy());
    Ok(Arc::new(client))
}

#[instrument(skip(config))]
pub async fn build_components(config: &AppConfig) -> Result<AppComponents> {
    let pool = SqlitePoolManager::new(config.base.database_path())
        .await
        .map_err(|e| {
            error!(error = %e, database_url = %config.base.database_url, "Failed to initialize storage");
            anyhow::anyhow!("Failed to initialize storage: {}", e)
        })?;

    let recipes: Arc<dyn RecipeRepository> = Arc::new(SqliteRecipeRepository::new(pool.clone()));
    let vectors: Arc<dyn VectorStore> = Arc::new(SqliteVectorStore::new(pool.clone()));
    let plans: Arc<dyn PlanRepository> = Arc::new(SqlitePlanRepository::new(pool.clone()));
    let metrics = MetricsRecorder::new(Arc::new(SqliteMetricsStore::new(pool.clone())));
    let sessions = Arc::new(AdjustmentSessions::new(
        Arc::new(SqliteSessionRepository::new(pool)),
        config.planning.session_ttl_secs,
    ));

    info!(
        base_url = %config.llm.base_url,
        api_key = %mask_token(&config.llm.api_key),
        analyst = %config.models.analyst,
        chef = %config.models.chef,
        reviewer = %config.models.reviewer,
        embedding_model = %config.embedding.model,
        "step: provider clients configured"
    );
    let embedder: Arc<dyn EmbeddingService> = Arc::new(OpenAIEmbedding::from_config(&config.embedding));

    let retriever = Arc::new(RecipeRetriever::new(
        recipes.clone(),
        vectors.clone(),
        embedder.clone(),
        RetrieverConfig {
            small_pool_threshold: config.planning.small_pool_threshold,
            top_k: config.planning.retrieval_top_k,
            ..RetrieverConfig::default()
        },
    ));
    let planner = Planner::new(
        retriever,
        Analyst::new(text_generator(&config.llm, &config.models.analyst)?)?,
        Chef::new(text_generator(&config.llm, &config.models.chef)?)?,
        PlanReviewer::new(text_generator(&config.llm, &config.models.reviewer)?)?,
    )
    .with_cadence_mode(config.planning.cadence_mode);

    let lifecycle = PlanLifecycle::new(
        plans,
        recipes.clone(),
        ShoppingListGenerator::new(text_generator(&config.llm, &config.models.chef)?)?,
    );

    Ok(AppComponents {
        recipes,
        vectors,
        embedder,
        metrics,
        sessions,
        planner: Arc::new(planner),
        lifecycle: Arc::new(lifecycle),
    })
}

impl AppComponents {
    pub fn conversation_handler(&self, config: &AppConfig, transport: Arc<dyn ChatTransport>) -> ConversationHandler {
        ConversationHandler::new(
            self.planner.clone(),
            self.lifecycle.clone(),
            self.sessions.clone(),
            self.metrics.clone(),
            transport,
            BotSettings {
                allowed_user_ids: config.base.allowed_user_ids.clone(),
                admin_user_id: config.base.admin_telegram_id,
                household: config.planning.household.clone(),
                request_timeout: Duration::from_secs(config.base.request_timeout_secs),
            },
        )
    }

    pub fn ingestor(&self, config: &AppConfig) -> Result<RecipeIngestor> {
        let extractor = RecipeExtractor::new(text_generator(&config.llm, &config.models.extractor)?)?;
        let cache = EmbeddingCache::new(self.vectors.clone(), self.embedder.clone(), config.embedding.model.clone());
        Ok(RecipeIngestor::new(
            extractor,
            cache,
            self.recipes.clone(),
            self.metrics.clone(),
        ))
    }

    /// `None` unless the Ghost URL and Admin API key are configured.
    pub fn clipper(&self, config: &AppConfig) -> Result<Option<RecipeClipper>> {
        let Some((url, admin_key)) = config.ghost.admin() else {
            info!("step: Ghost admin key not set, link clipping disabled");
            return Ok(None);
        };
        let publisher = GhostPublisher::new(url, admin_key)?;
        let clipper = RecipeClipper::new(
            Arc::new(self.ingestor(config)?),
            Arc::new(publisher),
            self.metrics.clone(),
        )?;
        Ok(Some(clipper))
    }
}

pub fn ghost_client(config: &AppConfig) -> Result<GhostClient> {
    let (url, key) = config.ghost.require()?;
    GhostClient::new(url, key)
}
