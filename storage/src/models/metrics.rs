use chrono::{DateTime, Utc};

/// One agent execution as recorded by the metrics sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionMetric {
    pub agent_name: String,
    pub model: String,
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub latency_ms: i64,
    pub recorded_at: DateTime<Utc>,
}

/// Token totals for one UTC day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyUsage {
    /// `YYYY-MM-DD`
    pub date: String,
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub executions: i64,
}
