//! Storage crate: SQLite persistence for the meal planner.
//!
//! ## Modules
//!
//! - [`error`] – Storage error types
//! - [`models`] – Recipe, EmbeddingRecord, MealPlan, ShoppingList, Session, ExecutionMetric
//! - [`repository`] – Repository traits consumed by the planner
//! - [`vector`] – f32 blob codec and cosine similarity
//! - `*_repo` – SQLite implementations
//! - [`sqlite_pool`] – SqlitePoolManager and schema bootstrap
//!
//! All timestamps are stored as Unix milliseconds.

mod embedding_repo;
mod error;
mod metrics_repo;
mod models;
mod plan_repo;
mod recipe_repo;
mod repository;
mod schema;
mod session_repo;
mod sqlite_pool;
pub mod vector;

pub use embedding_repo::SqliteVectorStore;
pub use error::StorageError;
pub use metrics_repo::SqliteMetricsStore;
pub use models::{
    DailyUsage, DayPlan, EmbeddingRecord, ExecutionMetric, MealPlan, PlanStatus, Recipe,
    ScoredRecipe, Session, ShoppingList,
};
pub use plan_repo::SqlitePlanRepository;
pub use recipe_repo::SqliteRecipeRepository;
pub use repository::{MetricsSink, PlanRepository, RecipeRepository, SessionRepository, VectorStore};
pub use session_repo::SqliteSessionRepository;
pub use sqlite_pool::SqlitePoolManager;
