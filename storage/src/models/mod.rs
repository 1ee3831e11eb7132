//! Persistence models.

mod metrics;
mod plan;
mod recipe;
mod session;

pub use metrics::{DailyUsage, ExecutionMetric};
pub use plan::{DayPlan, MealPlan, PlanStatus, ShoppingList};
pub use recipe::{EmbeddingRecord, Recipe, ScoredRecipe};
pub use session::Session;

use chrono::{DateTime, Utc};

use crate::StorageError;

pub(crate) fn to_millis(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

pub(crate) fn from_millis(ms: i64) -> Result<DateTime<Utc>, StorageError> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| StorageError::InvalidData(format!("timestamp out of range: {}", ms)))
}
