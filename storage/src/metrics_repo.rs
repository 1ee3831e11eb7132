//! Execution metrics on SQLite.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;

use crate::models::{to_millis, DailyUsage, ExecutionMetric};
use crate::repository::MetricsSink;
use crate::sqlite_pool::SqlitePoolManager;
use crate::StorageError;

#[derive(Clone)]
pub struct SqliteMetricsStore {
    pool_manager: SqlitePoolManager,
}

impl SqliteMetricsStore {
    pub fn new(pool_manager: SqlitePoolManager) -> Self {
        Self { pool_manager }
    }
}

#[async_trait]
impl MetricsSink for SqliteMetricsStore {
    async fn record(&self, metric: &ExecutionMetric) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO execution_metrics (agent_name, model, prompt_tokens, completion_tokens, latency_ms, recorded_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&metric.agent_name)
        .bind(&metric.model)
        .bind(metric.prompt_tokens)
        .bind(metric.completion_tokens)
        .bind(metric.latency_ms)
        .bind(to_millis(metric.recorded_at))
        .execute(self.pool_manager.pool())
        .await?;
        Ok(())
    }

    async fn daily_usage(&self, since: DateTime<Utc>) -> Result<Vec<DailyUsage>, StorageError> {
        let rows = sqlx::query(
            r#"
            SELECT date(recorded_at / 1000, 'unixepoch') AS day,
                   SUM(prompt_tokens) AS prompt_total,
                   SUM(completion_tokens) AS completion_total,
                   COUNT(*) AS executions
            FROM execution_metrics
            WHERE recorded_at >= ?
            GROUP BY day
            ORDER BY day
            "#,
        )
        .bind(to_millis(since))
        .fetch_all(self.pool_manager.pool())
        .await?;

        rows.iter()
            .map(|row| -> Result<DailyUsage, StorageError> {
                Ok(DailyUsage {
                    date: row.try_get("day")?,
                    prompt_tokens: row.try_get("prompt_total")?,
                    completion_tokens: row.try_get("completion_total")?,
                    executions: row.try_get("executions")?,
                })
            })
            .collect()
    }

    async fn cleanup(&self, before: DateTime<Utc>) -> Result<u64, StorageError> {
        let result = sqlx::query("DELETE FROM execution_metrics WHERE recorded_at < ?")
            .bind(to_millis(before))
            .execute(self.pool_manager.pool())
            .await?;
        Ok(result.rows_affected())
    }
}
