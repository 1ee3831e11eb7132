//! Meal plans and shopping lists on SQLite.
//!
//! The partial unique index `idx_meal_plans_active_week` guarantees at most one Draft, Adjusting
//! or Final plan per (user, week); replacing a plan goes through [`PlanRepository::save_replacing_week`].

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::info;

use crate::models::{from_millis, to_millis, MealPlan, PlanStatus, ShoppingList};
use crate::repository::PlanRepository;
use crate::sqlite_pool::SqlitePoolManager;
use crate::StorageError;

const WEEK_FORMAT: &str = "%Y-%m-%d";
const OCCUPYING: &str = "('draft', 'final', 'adjusting')";

#[derive(Clone)]
pub struct SqlitePlanRepository {
    pool_manager: SqlitePoolManager,
}

impl SqlitePlanRepository {
    pub fn new(pool_manager: SqlitePoolManager) -> Self {
        Self { pool_manager }
    }
}

fn week_key(week_start: NaiveDate) -> String {
    week_start.format(WEEK_FORMAT).to_string()
}

fn plan_from_row(row: &SqliteRow) -> Result<MealPlan, StorageError> {
    let week: String = row.try_get("week_start")?;
    let week_start = NaiveDate::parse_from_str(&week, WEEK_FORMAT)
        .map_err(|e| StorageError::InvalidData(format!("bad week_start '{}': {}", week, e)))?;
    let status: String = row.try_get("status")?;
    let days: String = row.try_get("days")?;
    let shopping_list: Option<String> = row.try_get("shopping_list")?;

    Ok(MealPlan {
        id: Some(row.try_get("id")?),
        user_id: row.try_get("user_id")?,
        week_start,
        status: status.parse()?,
        days: serde_json::from_str(&days)?,
        shopping_list: shopping_list
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?,
        request: row.try_get("request")?,
        created_at: from_millis(row.try_get("created_at")?)?,
    })
}

struct PlanInsert {
    week: String,
    status: &'static str,
    days: String,
    shopping_list: Option<String>,
}

impl PlanInsert {
    fn from_plan(plan: &MealPlan) -> Result<Self, StorageError> {
        Ok(Self {
            week: week_key(plan.week_start),
            status: plan.status.as_str(),
            days: serde_json::to_string(&plan.days)?,
            shopping_list: plan
                .shopping_list
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?,
        })
    }
}

const INSERT_PLAN: &str = r#"
    INSERT INTO meal_plans (user_id, week_start, status, days, shopping_list, request, created_at, updated_at)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?)
"#;

#[async_trait]
impl PlanRepository for SqlitePlanRepository {
    async fn exists_for_week(&self, user_id: i64, week_start: NaiveDate) -> Result<bool, StorageError> {
        let sql = format!(
            "SELECT COUNT(*) FROM meal_plans WHERE user_id = ? AND week_start = ? AND status IN {}",
            OCCUPYING
        );
        let count: i64 = sqlx::query_scalar(&sql)
            .bind(user_id)
            .bind(week_key(week_start))
            .fetch_one(self.pool_manager.pool())
            .await?;
        Ok(count > 0)
    }

    async fn save(&self, plan: &MealPlan) -> Result<i64, StorageError> {
        let insert = PlanInsert::from_plan(plan)?;
        let now = to_millis(Utc::now());
        let result = sqlx::query(INSERT_PLAN)
            .bind(plan.user_id)
            .bind(&insert.week)
            .bind(insert.status)
            .bind(&insert.days)
            .bind(&insert.shopping_list)
            .bind(&plan.request)
            .bind(to_millis(plan.created_at))
            .bind(now)
            .execute(self.pool_manager.pool())
            .await
            .map_err(|e| {
                StorageError::from_insert(
                    e,
                    format!("user {} already has a plan for week {}", plan.user_id, insert.week),
                )
            })?;

        let id = result.last_insert_rowid();
        info!(plan_id = id, user_id = plan.user_id, week = %insert.week, status = insert.status, "meal plan saved");
        Ok(id)
    }

    async fn save_replacing_week(&self, plan: &MealPlan) -> Result<i64, StorageError> {
        let insert = PlanInsert::from_plan(plan)?;
        let now = to_millis(Utc::now());

        let mut tx = self.pool_manager.pool().begin().await?;
        let superseded = sqlx::query(&format!(
            "UPDATE meal_plans SET status = 'superseded', updated_at = ? WHERE user_id = ? AND week_start = ? AND status IN {}",
            OCCUPYING
        ))
        .bind(now)
        .bind(plan.user_id)
        .bind(&insert.week)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let id = sqlx::query(INSERT_PLAN)
            .bind(plan.user_id)
            .bind(&insert.week)
            .bind(insert.status)
            .bind(&insert.days)
            .bind(&insert.shopping_list)
            .bind(&plan.request)
            .bind(to_millis(plan.created_at))
            .bind(now)
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();
        tx.commit().await?;

        info!(plan_id = id, user_id = plan.user_id, week = %insert.week, superseded, "meal plan replaced");
        Ok(id)
    }

    async fn update_status(&self, id: i64, status: PlanStatus) -> Result<(), StorageError> {
        let result = sqlx::query("UPDATE meal_plans SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(to_millis(Utc::now()))
            .bind(id)
            .execute(self.pool_manager.pool())
            .await
            .map_err(|e| StorageError::from_insert(e, format!("plan {} cannot become {}: week occupied", id, status)))?;
        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!("meal plan {}", id)));
        }
        info!(plan_id = id, status = %status, "meal plan status updated");
        Ok(())
    }

    async fn finalize(&self, id: i64, items: &[String]) -> Result<(), StorageError> {
        let items_json = serde_json::to_string(items)?;
        let now = to_millis(Utc::now());

        let mut tx = self.pool_manager.pool().begin().await?;
        let user_id: Option<i64> = sqlx::query_scalar(
            "UPDATE meal_plans SET status = 'final', shopping_list = ?, updated_at = ? WHERE id = ? AND status = 'draft' RETURNING user_id",
        )
        .bind(&items_json)
        .bind(now)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(user_id) = user_id else {
            return Err(StorageError::NotFound(format!("draft meal plan {}", id)));
        };

        sqlx::query(
            "INSERT INTO shopping_lists (user_id, meal_plan_id, items, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(id)
        .bind(&items_json)
        .bind(now)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        info!(plan_id = id, items = items.len(), "meal plan finalized");
        Ok(())
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<MealPlan>, StorageError> {
        let row = sqlx::query("SELECT * FROM meal_plans WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool_manager.pool())
            .await?;
        row.as_ref().map(plan_from_row).transpose()
    }

    async fn list_recent_by_user_id(&self, user_id: i64, limit: u32) -> Result<Vec<MealPlan>, StorageError> {
        let rows = sqlx::query(
            "SELECT * FROM meal_plans WHERE user_id = ? ORDER BY created_at DESC, id DESC LIMIT ?",
        )
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(self.pool_manager.pool())
        .await?;
        rows.iter().map(plan_from_row).collect()
    }

    async fn get_shopping_list(&self, meal_plan_id: i64) -> Result<Option<ShoppingList>, StorageError> {
        let row = sqlx::query(
            "SELECT id, user_id, meal_plan_id, items, created_at FROM shopping_lists WHERE meal_plan_id = ? ORDER BY id DESC LIMIT 1",
        )
        .bind(meal_plan_id)
        .fetch_optional(self.pool_manager.pool())
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let items: String = row.try_get("items")?;
        Ok(Some(ShoppingList {
            id: Some(row.try_get("id")?),
            user_id: row.try_get("user_id")?,
            meal_plan_id: row.try_get("meal_plan_id")?,
            items: serde_json::from_str(&items)?,
            created_at: from_millis(row.try_get("created_at")?)?,
        }))
    }
}
