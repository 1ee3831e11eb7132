//! Embedding store on SQLite with an exact linear cosine scan.

use std::cmp::Ordering;
use std::collections::HashSet;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, Sqlite};
use tracing::{info, warn};

use crate::models::{to_millis, EmbeddingRecord, ScoredRecipe};
use crate::repository::VectorStore;
use crate::sqlite_pool::SqlitePoolManager;
use crate::vector::{cosine_similarity, decode_vector, encode_vector};
use crate::StorageError;

#[derive(Clone)]
pub struct SqliteVectorStore {
    pool_manager: SqlitePoolManager,
}

impl SqliteVectorStore {
    pub fn new(pool_manager: SqlitePoolManager) -> Self {
        Self { pool_manager }
    }
}

pub(crate) async fn upsert_embedding<'e, E>(
    executor: E,
    record: &EmbeddingRecord,
) -> Result<(), StorageError>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO recipe_embeddings (recipe_id, embedding, content_hash, updated_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(recipe_id) DO UPDATE SET
            embedding = excluded.embedding,
            content_hash = excluded.content_hash,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(&record.recipe_id)
    .bind(encode_vector(&record.vector))
    .bind(&record.content_hash)
    .bind(to_millis(Utc::now()))
    .execute(executor)
    .await?;
    Ok(())
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn save(&self, record: &EmbeddingRecord) -> Result<(), StorageError> {
        upsert_embedding(self.pool_manager.pool(), record).await
    }

    async fn get(&self, recipe_id: &str) -> Result<Option<EmbeddingRecord>, StorageError> {
        let row = sqlx::query(
            "SELECT embedding, content_hash FROM recipe_embeddings WHERE recipe_id = ?",
        )
        .bind(recipe_id)
        .fetch_optional(self.pool_manager.pool())
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let bytes: Vec<u8> = row.try_get("embedding")?;
        let vector = decode_vector(&bytes).ok_or_else(|| StorageError::CorruptVector {
            recipe_id: recipe_id.to_string(),
            byte_len: bytes.len(),
        })?;
        Ok(Some(EmbeddingRecord {
            recipe_id: recipe_id.to_string(),
            vector,
            content_hash: row.try_get("content_hash")?,
        }))
    }

    async fn find_similar(
        &self,
        query: &[f32],
        limit: usize,
        exclude: &[String],
    ) -> Result<Vec<ScoredRecipe>, StorageError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let excluded: HashSet<&str> = exclude.iter().map(String::as_str).collect();

        let rows = sqlx::query("SELECT recipe_id, embedding FROM recipe_embeddings")
            .fetch_all(self.pool_manager.pool())
            .await?;

        let mut scored = Vec::with_capacity(rows.len());
        for row in rows {
            let recipe_id: String = row.try_get("recipe_id")?;
            if excluded.contains(recipe_id.as_str()) {
                continue;
            }
            let bytes: Vec<u8> = row.try_get("embedding")?;
            let Some(vector) = decode_vector(&bytes) else {
                warn!(recipe_id = %recipe_id, byte_len = bytes.len(), "skipping corrupt embedding");
                continue;
            };
            let score = cosine_similarity(query, &vector);
            scored.push(ScoredRecipe { recipe_id, score });
        }

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.recipe_id.cmp(&b.recipe_id))
        });
        scored.truncate(limit);

        info!(
            results = scored.len(),
            limit,
            excluded = excluded.len(),
            "step: find_similar done"
        );
        Ok(scored)
    }
}
