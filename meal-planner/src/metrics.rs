//! Usage accounting: turns stage [`AgentMeta`]s into [`ExecutionMetric`] rows and renders the
//! `/metrics` report.

use std::sync::Arc;

use chrono::{Duration, Utc};
use llm_client::AgentMeta;
use storage::{ExecutionMetric, MetricsSink, StorageError};
use tracing::{debug, warn};

/// Prompts above this many tokens trigger an admin alert.
pub const CONTEXT_BLOAT_THRESHOLD: u32 = 4000;

#[derive(Clone)]
pub struct MetricsRecorder {
    sink: Arc<dyn MetricsSink>,
}

impl MetricsRecorder {
    pub fn new(sink: Arc<dyn MetricsSink>) -> Self {
        Self { sink }
    }

    /// Stores one stage record. Zero-usage records (cache hits, reused recipes) are skipped.
    /// A sink failure is logged and never fails the caller.
    pub async fn record_meta(&self, meta: &AgentMeta) {
        if meta.usage.is_zero() {
            debug!(agent = %meta.agent_name, "skip zero-usage metric");
            return;
        }
        let metric = ExecutionMetric {
            agent_name: meta.agent_name.clone(),
            model: meta.usage.model.clone(),
            prompt_tokens: i64::from(meta.usage.prompt_tokens),
            completion_tokens: i64::from(meta.usage.completion_tokens),
            latency_ms: i64::try_from(meta.latency.as_millis()).unwrap_or(i64::MAX),
            recorded_at: Utc::now(),
        };
        if let Err(e) = self.sink.record(&metric).await {
            warn!(error = %e, agent = %meta.agent_name, "Failed to record execution metric");
        }
    }

    pub async fn record_all(&self, metas: &[AgentMeta]) {
        for meta in metas {
            self.record_meta(meta).await;
        }
    }

    /// Plain-text token totals per day for the last `days` days.
    pub async fn daily_report(&self, days: u32) -> Result<String, StorageError> {
        let since = Utc::now() - Duration::days(i64::from(days));
        let usage = self.sink.daily_usage(since).await?;
        if usage.is_empty() {
            return Ok(format!("No agent executions in the last {} days.", days));
        }

        let mut report = format!("Token usage, last {} days:\n", days);
        let (mut prompt, mut completion, mut runs) = (0i64, 0i64, 0i64);
        for day in &usage {
            report.push_str(&format!(
                "{}: {} prompt / {} completion ({} runs)\n",
                day.date, day.prompt_tokens, day.completion_tokens, day.executions
            ));
            prompt += day.prompt_tokens;
            completion += day.completion_tokens;
            runs += day.executions;
        }
        report.push_str(&format!(
            "Total: {} prompt / {} completion ({} runs)",
            prompt, completion, runs
        ));
        Ok(report)
    }

    /// Drops records older than `days`.
    pub async fn cleanup(&self, days: u32) -> Result<u64, StorageError> {
        self.sink
            .cleanup(Utc::now() - Duration::days(i64::from(days)))
            .await
    }
}

/// Whether a stage's prompt is large enough to alert the admin.
pub fn exceeds_context_budget(meta: &AgentMeta) -> bool {
    meta.usage.prompt_tokens > CONTEXT_BLOAT_THRESHOLD
}

#[cfg(test)]
mod tests {
    use super::*;
    use llm_client::TokenUsage;
    use std::time::Duration as StdDuration;
    use storage::{SqliteMetricsStore, SqlitePoolManager};

    async fn recorder() -> MetricsRecorder {
        let pool = SqlitePoolManager::in_memory().await.unwrap();
        MetricsRecorder::new(Arc::new(SqliteMetricsStore::new(pool)))
    }

    #[tokio::test]
    async fn test_zero_usage_is_skipped() {
        let metrics = recorder().await;
        metrics
            .record_all(&[
                AgentMeta::free("Embedding"),
                AgentMeta::new("Chef", TokenUsage::new("m", 1200, 300), StdDuration::from_millis(850)),
            ])
            .await;

        let report = metrics.daily_report(1).await.unwrap();
        assert!(report.contains("1200 prompt / 300 completion (1 runs)"), "{}", report);
    }

    #[tokio::test]
    async fn test_empty_report() {
        let metrics = recorder().await;
        assert_eq!(
            metrics.daily_report(7).await.unwrap(),
            "No agent executions in the last 7 days."
        );
    }

    #[test]
    fn test_context_budget() {
        let big = AgentMeta::new("Analyst", TokenUsage::new("m", 4001, 10), StdDuration::ZERO);
        let small = AgentMeta::new("Analyst", TokenUsage::new("m", 4000, 10), StdDuration::ZERO);
        assert!(exceeds_context_budget(&big));
        assert!(!exceeds_context_budget(&small));
    }
}
