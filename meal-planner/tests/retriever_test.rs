//! Tests for [`meal_planner::recipe::RecipeRetriever`] with a mocked embedding provider.

use std::sync::Arc;

use async_trait::async_trait;
use embedding::EmbeddingService;
use meal_planner::recipe::{RecipeRetriever, RetrieverConfig};
use meal_planner::AgentError;
use mockall::mock;
use mockall::predicate::function;
use storage::{
    EmbeddingRecord, Recipe, RecipeRepository, SqlitePoolManager, SqliteRecipeRepository, SqliteVectorStore,
    VectorStore,
};

mock! {
    pub Embedder {}

    #[async_trait]
    impl EmbeddingService for Embedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, anyhow::Error>;
    }
}

struct Corpus {
    recipes: Arc<dyn RecipeRepository>,
    vectors: Arc<dyn VectorStore>,
}

async fn corpus(entries: &[(&str, &str, Vec<f32>)]) -> Corpus {
    let pool = SqlitePoolManager::in_memory().await.unwrap();
    let recipes: Arc<dyn RecipeRepository> = Arc::new(SqliteRecipeRepository::new(pool.clone()));
    let vectors: Arc<dyn VectorStore> = Arc::new(SqliteVectorStore::new(pool));
    for (id, title, vector) in entries {
        let recipe = Recipe {
            id: id.to_string(),
            title: title.to_string(),
            ..Default::default()
        };
        recipes
            .save_with_embedding(&recipe, &EmbeddingRecord::new(*id, vector.clone(), "h"))
            .await
            .unwrap();
    }
    Corpus { recipes, vectors }
}

fn retriever(corpus: &Corpus, embedder: MockEmbedder, config: RetrieverConfig) -> RecipeRetriever {
    RecipeRetriever::new(
        corpus.recipes.clone(),
        corpus.vectors.clone(),
        Arc::new(embedder),
        config,
    )
}

fn titles(recipes: &[Recipe]) -> Vec<&str> {
    recipes.iter().map(|r| r.title.as_str()).collect()
}

/// **Test: above the small-pool threshold candidates come from vector search, best first**
#[tokio::test]
async fn test_vector_search_orders_by_similarity() {
    let corpus = corpus(&[
        ("a", "Apple crumble", vec![0.0, 1.0]),
        ("b", "Bolognese", vec![1.0, 0.1]),
        ("c", "Carbonara", vec![0.9, 0.4]),
    ])
    .await;
    let mut embedder = MockEmbedder::new();
    embedder
        .expect_embed()
        .with(function(|text: &str| text == "creamy pasta"))
        .times(1)
        .returning(|_| Ok(vec![1.0, 0.0]));

    let retriever = retriever(
        &corpus,
        embedder,
        RetrieverConfig {
            small_pool_threshold: 2,
            top_k: 2,
            feedback_top_k: 3,
        },
    );
    let found = retriever.retrieve("creamy pasta").await.unwrap();

    assert_eq!(titles(&found), vec!["Bolognese", "Carbonara"]);
}

#[tokio::test]
async fn test_feedback_retrieval_uses_wider_pool() {
    let corpus = corpus(&[
        ("a", "Apple crumble", vec![0.0, 1.0]),
        ("b", "Bolognese", vec![1.0, 0.1]),
        ("c", "Carbonara", vec![0.9, 0.4]),
    ])
    .await;
    let mut embedder = MockEmbedder::new();
    embedder.expect_embed().times(1).returning(|_| Ok(vec![1.0, 0.0]));

    let retriever = retriever(
        &corpus,
        embedder,
        RetrieverConfig {
            small_pool_threshold: 0,
            top_k: 1,
            feedback_top_k: 3,
        },
    );
    let found = retriever.retrieve_for_feedback("more pasta please").await.unwrap();

    assert_eq!(found.len(), 3);
    assert_eq!(found[0].title, "Bolognese");
}

/// **Test: a small corpus is returned whole without calling the provider**
#[tokio::test]
async fn test_small_pool_returns_everything() {
    let corpus = corpus(&[
        ("a", "Apple crumble", vec![0.0, 1.0]),
        ("b", "Bolognese", vec![1.0, 0.0]),
    ])
    .await;
    let mut embedder = MockEmbedder::new();
    embedder.expect_embed().times(0);

    let retriever = retriever(&corpus, embedder, RetrieverConfig::default());
    let mut found = titles(&retriever.retrieve("anything").await.unwrap())
        .into_iter()
        .map(str::to_string)
        .collect::<Vec<_>>();
    found.sort();

    assert_eq!(found, vec!["Apple crumble", "Bolognese"]);
}

#[tokio::test]
async fn test_embedding_failure_is_reported() {
    let corpus = corpus(&[("a", "Apple crumble", vec![0.0, 1.0])]).await;
    let mut embedder = MockEmbedder::new();
    embedder
        .expect_embed()
        .returning(|_| Err(anyhow::anyhow!("provider unavailable")));

    let retriever = retriever(
        &corpus,
        embedder,
        RetrieverConfig {
            small_pool_threshold: 0,
            ..RetrieverConfig::default()
        },
    );
    let err = retriever.retrieve("pasta").await.unwrap_err();

    assert!(matches!(err, AgentError::Embedding(_)));
}

#[tokio::test]
async fn test_empty_corpus_has_no_candidates() {
    let corpus = corpus(&[]).await;
    let mut embedder = MockEmbedder::new();
    embedder.expect_embed().times(0);

    let retriever = retriever(&corpus, embedder, RetrieverConfig::default());
    let err = retriever.retrieve("pasta").await.unwrap_err();

    assert!(matches!(err, AgentError::NoCandidates));
}
