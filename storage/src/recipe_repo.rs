//! Recipe corpus on SQLite. The full recipe is kept as JSON in `recipes.data`.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, Sqlite};
use tracing::{debug, info};

use crate::embedding_repo::upsert_embedding;
use crate::models::{to_millis, EmbeddingRecord, Recipe};
use crate::repository::RecipeRepository;
use crate::sqlite_pool::SqlitePoolManager;
use crate::StorageError;

#[derive(Clone)]
pub struct SqliteRecipeRepository {
    pool_manager: SqlitePoolManager,
}

impl SqliteRecipeRepository {
    pub fn new(pool_manager: SqlitePoolManager) -> Self {
        Self { pool_manager }
    }
}

async fn upsert_recipe<'e, E>(executor: E, recipe: &Recipe) -> Result<(), StorageError>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let data = serde_json::to_string(recipe)?;
    sqlx::query(
        r#"
        INSERT INTO recipes (id, title, data, source_updated_at, updated_at)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            title = excluded.title,
            data = excluded.data,
            source_updated_at = excluded.source_updated_at,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(&recipe.id)
    .bind(&recipe.title)
    .bind(data)
    .bind(recipe.source_updated_at.map(to_millis))
    .bind(to_millis(Utc::now()))
    .execute(executor)
    .await?;
    Ok(())
}

fn decode_recipe(data: &str) -> Result<Recipe, StorageError> {
    Ok(serde_json::from_str(data)?)
}

#[async_trait]
impl RecipeRepository for SqliteRecipeRepository {
    async fn count(&self) -> Result<usize, StorageError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM recipes")
            .fetch_one(self.pool_manager.pool())
            .await?;
        Ok(count as usize)
    }

    async fn list(&self, exclude: &[String]) -> Result<Vec<Recipe>, StorageError> {
        let excluded: HashSet<&str> = exclude.iter().map(String::as_str).collect();
        let rows = sqlx::query("SELECT id, data FROM recipes ORDER BY id")
            .fetch_all(self.pool_manager.pool())
            .await?;

        let mut recipes = Vec::with_capacity(rows.len());
        for row in rows {
            let id: String = row.try_get("id")?;
            if excluded.contains(id.as_str()) {
                continue;
            }
            let data: String = row.try_get("data")?;
            recipes.push(decode_recipe(&data)?);
        }
        Ok(recipes)
    }

    async fn get_by_ids(&self, ids: &[String]) -> Result<Vec<Recipe>, StorageError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!("SELECT id, data FROM recipes WHERE id IN ({})", placeholders);
        let mut query = sqlx::query(&sql);
        for id in ids {
            query = query.bind(id);
        }
        let rows = query.fetch_all(self.pool_manager.pool()).await?;

        let mut by_id = HashMap::with_capacity(rows.len());
        for row in rows {
            let id: String = row.try_get("id")?;
            let data: String = row.try_get("data")?;
            by_id.insert(id, decode_recipe(&data)?);
        }

        let recipes: Vec<Recipe> = ids.iter().filter_map(|id| by_id.remove(id)).collect();
        debug!(requested = ids.len(), found = recipes.len(), "recipes fetched by id");
        Ok(recipes)
    }

    async fn get(&self, id: &str) -> Result<Option<Recipe>, StorageError> {
        let data: Option<String> = sqlx::query_scalar("SELECT data FROM recipes WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool_manager.pool())
            .await?;
        data.as_deref().map(decode_recipe).transpose()
    }

    async fn save(&self, recipe: &Recipe) -> Result<(), StorageError> {
        upsert_recipe(self.pool_manager.pool(), recipe).await?;
        info!(recipe_id = %recipe.id, title = %recipe.title, "recipe saved");
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool, StorageError> {
        let mut tx = self.pool_manager.pool().begin().await?;
        sqlx::query("DELETE FROM recipe_embeddings WHERE recipe_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM recipes WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn save_with_embedding(
        &self,
        recipe: &Recipe,
        embedding: &EmbeddingRecord,
    ) -> Result<(), StorageError> {
        if embedding.recipe_id != recipe.id {
            return Err(StorageError::InvalidData(format!(
                "embedding for '{}' cannot be stored with recipe '{}'",
                embedding.recipe_id, recipe.id
            )));
        }

        let mut tx = self.pool_manager.pool().begin().await?;
        upsert_recipe(&mut *tx, recipe).await?;
        upsert_embedding(&mut *tx, embedding).await?;
        tx.commit().await?;

        info!(
            recipe_id = %recipe.id,
            dimension = embedding.vector.len(),
            "recipe and embedding saved"
        );
        Ok(())
    }
}
