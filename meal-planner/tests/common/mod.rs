//! Shared test utilities for meal-planner integration tests.
//!
//! Provides a scripted [`TextGenerator`] keyed by prompt heading, a keyword [`EmbeddingService`],
//! a [`ChatTransport`] that records every outbound message, and [`TestApp`], which wires the
//! real services over an in-memory SQLite pool.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use embedding::EmbeddingService;
use llm_client::{ContentResponse, LlmError, TextGenerator, TokenUsage};
use meal_planner::bot::{BotSettings, ConversationHandler};
use meal_planner::clipper::{NewPost, RecipeClipper, RecipePublisher};
use meal_planner::ghost::BlogPost;
use meal_planner::ingestion::RecipeIngestor;
use meal_planner::lifecycle::PlanLifecycle;
use meal_planner::metrics::MetricsRecorder;
use meal_planner::planner::{
    Analyst, CadenceMode, Chef, Household, PlanReviewer, Planner, ShoppingListGenerator, SLOT_LABELS,
};
use meal_planner::recipe::{EmbeddingCache, RecipeExtractor, RecipeRetriever, RetrieverConfig};
use meal_planner::session::AdjustmentSessions;
use meal_planner::{ActionButton, ChatTransport, TransportError};
use storage::{
    EmbeddingRecord, PlanRepository, Recipe, RecipeRepository, SessionRepository, SqliteMetricsStore,
    SqlitePlanRepository, SqlitePoolManager, SqliteRecipeRepository, SqliteSessionRepository,
    SqliteVectorStore, VectorStore,
};

pub const ANALYST: &str = "# Analyst";
pub const CHEF: &str = "# Chef";
pub const REVIEWER: &str = "# Plan Reviewer";
pub const SHOPPING: &str = "# Shopping List";
pub const EXTRACTOR: &str = "# Recipe Extractor";

#[derive(Clone)]
enum Reply {
    Json(String),
    Fail(String),
    Slow(Duration, String),
}

/// Answers each prompt by its first line. Unscripted headings fail with a 500.
pub struct ScriptedGenerator {
    replies: Mutex<HashMap<&'static str, Reply>>,
    prompts: Mutex<Vec<String>>,
    prompt_tokens: AtomicU32,
}

impl ScriptedGenerator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(HashMap::new()),
            prompts: Mutex::new(Vec::new()),
            prompt_tokens: AtomicU32::new(120),
        })
    }

    /// Prompt tokens reported on every following reply.
    pub fn report_prompt_tokens(&self, tokens: u32) {
        self.prompt_tokens.store(tokens, Ordering::SeqCst);
    }

    pub fn reply(&self, heading: &'static str, json: &str) {
        self.set(heading, Reply::Json(json.to_string()));
    }

    pub fn fail(&self, heading: &'static str, message: &str) {
        self.set(heading, Reply::Fail(message.to_string()));
    }

    /// Replies with `json` after `delay`.
    pub fn slow(&self, heading: &'static str, delay: Duration, json: &str) {
        self.set(heading, Reply::Slow(delay, json.to_string()));
    }

    fn set(&self, heading: &'static str, reply: Reply) {
        self.replies.lock().unwrap().insert(heading, reply);
    }

    pub fn calls(&self, heading: &str) -> usize {
        self.prompts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.starts_with(heading))
            .count()
    }

    pub fn last_prompt(&self, heading: &str) -> Option<String> {
        self.prompts
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|p| p.starts_with(heading))
            .cloned()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &str) -> Result<ContentResponse, LlmError> {
        let prompt = prompt.trim_start().to_string();
        self.prompts.lock().unwrap().push(prompt.clone());
        let reply = {
            let replies = self.replies.lock().unwrap();
            replies
                .iter()
                .find(|(heading, _)| prompt.starts_with(*heading))
                .map(|(_, reply)| reply.clone())
        };
        let content = match reply {
            Some(Reply::Json(json)) => json,
            Some(Reply::Slow(delay, json)) => {
                tokio::time::sleep(delay).await;
                json
            }
            Some(Reply::Fail(message)) => return Err(LlmError::ApiError { status: 500, message }),
            None => {
                return Err(LlmError::ApiError {
                    status: 500,
                    message: "no scripted reply".to_string(),
                })
            }
        };
        Ok(ContentResponse {
            content,
            usage: TokenUsage::new("test-model", self.prompt_tokens.load(Ordering::SeqCst), 40),
        })
    }

    fn model(&self) -> &str {
        "test-model"
    }
}

/// Returns the vector of the first keyword found in the lowercased text, else `fallback`.
pub struct KeywordEmbedder {
    keywords: Vec<(&'static str, Vec<f32>)>,
    fallback: Vec<f32>,
    calls: AtomicUsize,
}

impl KeywordEmbedder {
    pub fn new(keywords: Vec<(&'static str, Vec<f32>)>, fallback: Vec<f32>) -> Arc<Self> {
        Arc::new(Self {
            keywords,
            fallback,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingService for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, anyhow::Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let lower = text.to_lowercase();
        Ok(self
            .keywords
            .iter()
            .find(|(keyword, _)| lower.contains(keyword))
            .map(|(_, vector)| vector.clone())
            .unwrap_or_else(|| self.fallback.clone()))
    }
}

/// One message sent through [`RecordingTransport`].
#[derive(Debug, Clone)]
pub struct Sent {
    pub chat_id: i64,
    pub text: String,
    pub actions: Vec<ActionButton>,
}

#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<Sent>>,
}

impl RecordingTransport {
    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn last(&self) -> Sent {
        self.sent().last().cloned().expect("nothing was sent")
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }

    /// Callback data of the last message's button labelled `label`.
    pub fn button(&self, label: &str) -> String {
        self.last()
            .actions
            .iter()
            .find(|a| a.label == label)
            .map(|a| a.data.clone())
            .unwrap_or_else(|| panic!("no '{}' button on the last message", label))
    }
}

#[async_trait]
impl ChatTransport for RecordingTransport {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), TransportError> {
        self.send_with_actions(chat_id, text, &[]).await
    }

    async fn send_with_actions(
        &self,
        chat_id: i64,
        text: &str,
        actions: &[ActionButton],
    ) -> Result<(), TransportError> {
        self.sent.lock().unwrap().push(Sent {
            chat_id,
            text: text.to_string(),
            actions: actions.to_vec(),
        });
        Ok(())
    }
}

pub fn recipe(id: &str, title: &str, ingredients: &[&str]) -> Recipe {
    Recipe {
        id: id.to_string(),
        title: title.to_string(),
        ingredients: ingredients.iter().map(|s| s.to_string()).collect(),
        instructions: vec!["Cook it.".to_string()],
        tags: vec!["dinner".to_string()],
        prep_time: "25 min".to_string(),
        servings: "4".to_string(),
        source_updated_at: None,
    }
}

pub fn analyst_reply(meals: &[(&str, &str, &str)]) -> String {
    let meals: Vec<serde_json::Value> = meals
        .iter()
        .map(|(day, action, title)| serde_json::json!({"day": day, "action": action, "recipe_title": title}))
        .collect();
    serde_json::json!({ "planned_meals": meals }).to_string()
}

/// A cadence-conforming nine-slot Analyst reply alternating between two dishes.
pub fn weekly_reply(first: &str, second: &str) -> String {
    let plan = [
        ("Cook", first),
        ("Reuse", first),
        ("Cook", second),
        ("Reuse", second),
        ("Cook", first),
        ("Reuse", first),
        ("Cook", second),
        ("Reuse", second),
        ("Cook", first),
    ];
    let meals: Vec<(&str, &str, &str)> = SLOT_LABELS
        .iter()
        .zip(plan)
        .map(|(slot, (action, title))| (*slot, action, title))
        .collect();
    analyst_reply(&meals)
}

/// A blog that keeps what it is asked to publish. Post ids are `clip-<n>`.
#[derive(Default)]
pub struct RecordingPublisher {
    posts: Mutex<Vec<NewPost>>,
    fail: AtomicBool,
}

impl RecordingPublisher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    pub fn published(&self) -> Vec<NewPost> {
        self.posts.lock().unwrap().clone()
    }
}

#[async_trait]
impl RecipePublisher for RecordingPublisher {
    async fn publish(&self, post: &NewPost) -> anyhow::Result<BlogPost> {
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("blog is down");
        }
        let mut posts = self.posts.lock().unwrap();
        posts.push(post.clone());
        Ok(BlogPost {
            id: format!("clip-{}", posts.len()),
            title: post.title.clone(),
            html: post.html.clone(),
            tags: post.tags.clone(),
            updated_at: Some(chrono::TimeZone::with_ymd_and_hms(&chrono::Utc, 2024, 5, 1, 10, 0, 0).unwrap()),
        })
    }
}

/// Real services over an in-memory database with scripted providers.
pub struct TestApp {
    pub recipes: Arc<dyn RecipeRepository>,
    pub vectors: Arc<dyn VectorStore>,
    pub plans: Arc<dyn PlanRepository>,
    pub session_repo: Arc<dyn SessionRepository>,
    pub metrics_store: Arc<SqliteMetricsStore>,
    pub generator: Arc<ScriptedGenerator>,
    pub embedder: Arc<KeywordEmbedder>,
    pub retriever: Arc<RecipeRetriever>,
    pub planner: Arc<Planner>,
    pub lifecycle: Arc<PlanLifecycle>,
    pub sessions: Arc<AdjustmentSessions>,
    pub metrics: MetricsRecorder,
}

impl TestApp {
    pub async fn new(embedder: Arc<KeywordEmbedder>, retriever_config: RetrieverConfig) -> Self {
        let pool = SqlitePoolManager::in_memory().await.unwrap();
        Self::on_pool(pool, embedder, retriever_config)
    }

    /// Same wiring over an existing pool, e.g. a database file.
    pub fn on_pool(pool: SqlitePoolManager, embedder: Arc<KeywordEmbedder>, retriever_config: RetrieverConfig) -> Self {
        let recipes: Arc<dyn RecipeRepository> = Arc::new(SqliteRecipeRepository::new(pool.clone()));
        let vectors: Arc<dyn VectorStore> = Arc::new(SqliteVectorStore::new(pool.clone()));
        let plans: Arc<dyn PlanRepository> = Arc::new(SqlitePlanRepository::new(pool.clone()));
        let session_repo: Arc<dyn SessionRepository> = Arc::new(SqliteSessionRepository::new(pool.clone()));
        let metrics_store = Arc::new(SqliteMetricsStore::new(pool));
        let metrics = MetricsRecorder::new(metrics_store.clone());
        let generator = ScriptedGenerator::new();

        let retriever = Arc::new(RecipeRetriever::new(
            recipes.clone(),
            vectors.clone(),
            embedder.clone(),
            retriever_config,
        ));
        let planner = build_planner(retriever.clone(), generator.clone());
        let lifecycle = PlanLifecycle::new(
            plans.clone(),
            recipes.clone(),
            ShoppingListGenerator::new(generator.clone()).unwrap(),
        );
        let sessions = Arc::new(AdjustmentSessions::new(session_repo.clone(), 900));

        Self {
            recipes,
            vectors,
            plans,
            session_repo,
            metrics_store,
            generator,
            embedder,
            retriever,
            planner: Arc::new(planner),
            lifecycle: Arc::new(lifecycle),
            sessions,
            metrics,
        }
    }

    /// Two recipes with orthogonal vectors; "pasta" and "salad" queries embed onto them.
    pub async fn with_pasta_and_salad(retriever_config: RetrieverConfig) -> Self {
        let embedder = KeywordEmbedder::new(
            vec![("pasta", vec![1.0, 0.0]), ("salad", vec![0.0, 1.0])],
            vec![0.7, 0.7],
        );
        let app = Self::new(embedder, retriever_config).await;
        app.seed(recipe("pasta", "Pasta", &["Pasta", "Tomato"]), vec![1.0, 0.0])
            .await;
        app.seed(recipe("salad", "Salad", &["Lettuce", "Cucumber"]), vec![0.0, 1.0])
            .await;
        app
    }

    /// A planner over the same corpus and generator with another cadence mode.
    pub fn planner_with_cadence(&self, mode: CadenceMode) -> Planner {
        build_planner(self.retriever.clone(), self.generator.clone()).with_cadence_mode(mode)
    }

    pub fn ingestor(&self) -> RecipeIngestor {
        RecipeIngestor::new(
            RecipeExtractor::new(self.generator.clone()).unwrap(),
            EmbeddingCache::new(self.vectors.clone(), self.embedder.clone(), "text-embedding-3-small"),
            self.recipes.clone(),
            self.metrics.clone(),
        )
    }

    pub fn clipper(&self, publisher: Arc<RecordingPublisher>) -> Arc<RecipeClipper> {
        Arc::new(RecipeClipper::new(Arc::new(self.ingestor()), publisher, self.metrics.clone()).unwrap())
    }

    pub async fn seed(&self, recipe: Recipe, vector: Vec<f32>) {
        let record = EmbeddingRecord::new(recipe.id.clone(), vector, format!("seed-{}", recipe.id));
        self.recipes.save_with_embedding(&recipe, &record).await.unwrap();
    }

    /// Scripts a Pasta week for the Analyst and a one-day answer for the Chef.
    pub fn script_pasta_plan(&self) {
        self.generator.reply(ANALYST, &weekly_reply("Pasta", "Pasta"));
        self.generator.reply(
            CHEF,
            r#"{"plan": [{"day": "Monday", "recipe_title": "Cook: Pasta", "prep_time": "25 min", "note": "Double the sauce"}],
                "shopping_list": ["Pasta", "Tomato"]}"#,
        );
    }

    pub fn handler(&self, transport: Arc<RecordingTransport>, settings: BotSettings) -> ConversationHandler {
        ConversationHandler::new(
            self.planner.clone(),
            self.lifecycle.clone(),
            self.sessions.clone(),
            self.metrics.clone(),
            transport,
            settings,
        )
    }
}

fn build_planner(retriever: Arc<RecipeRetriever>, generator: Arc<ScriptedGenerator>) -> Planner {
    Planner::new(
        retriever,
        Analyst::new(generator.clone()).unwrap(),
        Chef::new(generator.clone()).unwrap(),
        PlanReviewer::new(generator).unwrap(),
    )
}

pub fn settings() -> BotSettings {
    BotSettings {
        allowed_user_ids: Vec::new(),
        admin_user_id: None,
        household: Household::default(),
        request_timeout: Duration::from_secs(5),
    }
}

/// Small pool threshold 0 forces vector search.
pub fn vector_search() -> RetrieverConfig {
    RetrieverConfig {
        small_pool_threshold: 0,
        ..RetrieverConfig::default()
    }
}
