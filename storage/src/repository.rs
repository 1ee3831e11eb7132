//! Repository traits. The planner depends on these, not on the SQLite types.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::models::{
    DailyUsage, EmbeddingRecord, ExecutionMetric, MealPlan, PlanStatus, Recipe, ScoredRecipe,
    Session, ShoppingList,
};
use crate::StorageError;

/// The recipe corpus.
#[async_trait]
pub trait RecipeRepository: Send + Sync {
    async fn count(&self) -> Result<usize, StorageError>;

    /// All recipes except those whose id is in `exclude`, ordered by id.
    async fn list(&self, exclude: &[String]) -> Result<Vec<Recipe>, StorageError>;

    /// Recipes for `ids` in the given order; unknown ids are skipped.
    async fn get_by_ids(&self, ids: &[String]) -> Result<Vec<Recipe>, StorageError>;

    async fn get(&self, id: &str) -> Result<Option<Recipe>, StorageError>;

    /// Insert or replace.
    async fn save(&self, recipe: &Recipe) -> Result<(), StorageError>;

    /// Removes the recipe and its embedding. Returns whether a recipe existed.
    async fn delete(&self, id: &str) -> Result<bool, StorageError>;

    /// Writes the recipe and its embedding in one transaction.
    async fn save_with_embedding(
        &self,
        recipe: &Recipe,
        embedding: &EmbeddingRecord,
    ) -> Result<(), StorageError>;
}

/// Recipe embeddings with exact cosine search.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or replace the embedding for `record.recipe_id`.
    async fn save(&self, record: &EmbeddingRecord) -> Result<(), StorageError>;

    async fn get(&self, recipe_id: &str) -> Result<Option<EmbeddingRecord>, StorageError>;

    /// Top `limit` recipes by cosine similarity to `query`, best first.
    async fn find_similar(
        &self,
        query: &[f32],
        limit: usize,
        exclude: &[String],
    ) -> Result<Vec<ScoredRecipe>, StorageError>;
}

#[async_trait]
pub trait PlanRepository: Send + Sync {
    /// Whether a Draft, Adjusting or Final plan exists for the week.
    async fn exists_for_week(&self, user_id: i64, week_start: NaiveDate) -> Result<bool, StorageError>;

    /// Inserts a new plan and returns its id. Fails with `Conflict` if the week is occupied.
    async fn save(&self, plan: &MealPlan) -> Result<i64, StorageError>;

    /// Marks every occupying plan of the same user and week `Superseded`, then inserts `plan`.
    async fn save_replacing_week(&self, plan: &MealPlan) -> Result<i64, StorageError>;

    async fn update_status(&self, id: i64, status: PlanStatus) -> Result<(), StorageError>;

    /// Attaches `items`, moves the plan from Draft to Final and records a shopping list, atomically.
    async fn finalize(&self, id: i64, items: &[String]) -> Result<(), StorageError>;

    async fn get_by_id(&self, id: i64) -> Result<Option<MealPlan>, StorageError>;

    /// Most recent first.
    async fn list_recent_by_user_id(&self, user_id: i64, limit: u32) -> Result<Vec<MealPlan>, StorageError>;

    async fn get_shopping_list(&self, meal_plan_id: i64) -> Result<Option<ShoppingList>, StorageError>;
}

#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn create(
        &self,
        user_id: i64,
        session_type: &str,
        state: &str,
        context: &serde_json::Value,
        expires_at: DateTime<Utc>,
    ) -> Result<i64, StorageError>;

    /// The most recently created session with `now < expires_at`.
    async fn get_active(&self, user_id: i64, now: DateTime<Utc>) -> Result<Option<Session>, StorageError>;

    async fn delete(&self, id: i64) -> Result<bool, StorageError>;

    /// Deletes sessions with `expires_at <= now`; returns how many.
    async fn cleanup_expired(&self, now: DateTime<Utc>) -> Result<u64, StorageError>;
}

/// Persistence for per-stage usage records.
#[async_trait]
pub trait MetricsSink: Send + Sync {
    async fn record(&self, metric: &ExecutionMetric) -> Result<(), StorageError>;

    /// Totals per UTC day for records at or after `since`, oldest day first.
    async fn daily_usage(&self, since: DateTime<Utc>) -> Result<Vec<DailyUsage>, StorageError>;

    /// Deletes records older than `before`; returns how many.
    async fn cleanup(&self, before: DateTime<Utc>) -> Result<u64, StorageError>;
}
