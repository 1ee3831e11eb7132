//! Conversational sessions on SQLite.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use tracing::{debug, info};

use crate::models::{from_millis, to_millis, Session};
use crate::repository::SessionRepository;
use crate::sqlite_pool::SqlitePoolManager;
use crate::StorageError;

#[derive(Clone)]
pub struct SqliteSessionRepository {
    pool_manager: SqlitePoolManager,
}

impl SqliteSessionRepository {
    pub fn new(pool_manager: SqlitePoolManager) -> Self {
        Self { pool_manager }
    }
}

#[async_trait]
impl SessionRepository for SqliteSessionRepository {
    async fn create(
        &self,
        user_id: i64,
        session_type: &str,
        state: &str,
        context: &serde_json::Value,
        expires_at: DateTime<Utc>,
    ) -> Result<i64, StorageError> {
        let id = sqlx::query(
            r#"
            INSERT INTO sessions (user_id, session_type, state, context, expires_at, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(session_type)
        .bind(state)
        .bind(context.to_string())
        .bind(to_millis(expires_at))
        .bind(to_millis(Utc::now()))
        .execute(self.pool_manager.pool())
        .await?
        .last_insert_rowid();

        info!(session_id = id, user_id, session_type, state, "session created");
        Ok(id)
    }

    async fn get_active(&self, user_id: i64, now: DateTime<Utc>) -> Result<Option<Session>, StorageError> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, session_type, state, context, expires_at, created_at
            FROM sessions
            WHERE user_id = ? AND expires_at > ?
            ORDER BY id DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(to_millis(now))
        .fetch_optional(self.pool_manager.pool())
        .await?;

        let Some(row) = row else {
            debug!(user_id, "no active session");
            return Ok(None);
        };
        let context: String = row.try_get("context")?;
        Ok(Some(Session {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            session_type: row.try_get("session_type")?,
            state: row.try_get("state")?,
            context: serde_json::from_str(&context)?,
            expires_at: from_millis(row.try_get("expires_at")?)?,
            created_at: from_millis(row.try_get("created_at")?)?,
        }))
    }

    async fn delete(&self, id: i64) -> Result<bool, StorageError> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(id)
            .execute(self.pool_manager.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn cleanup_expired(&self, now: DateTime<Utc>) -> Result<u64, StorageError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(to_millis(now))
            .execute(self.pool_manager.pool())
            .await?;
        let removed = result.rows_affected();
        if removed > 0 {
            info!(removed, "expired sessions removed");
        }
        Ok(removed)
    }
}
