use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tokens consumed by one provider call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
    pub model: String,
}

impl TokenUsage {
    pub fn new(model: impl Into<String>, prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
            model: model.into(),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.prompt_tokens == 0 && self.completion_tokens == 0
    }
}

/// Generated text plus the usage that produced it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentResponse {
    pub content: String,
    pub usage: TokenUsage,
}

/// Per-stage execution record: which agent ran, what it cost, how long it took.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentMeta {
    pub agent_name: String,
    pub usage: TokenUsage,
    pub latency: Duration,
}

impl AgentMeta {
    pub fn new(agent_name: impl Into<String>, usage: TokenUsage, latency: Duration) -> Self {
        Self {
            agent_name: agent_name.into(),
            usage,
            latency,
        }
    }

    /// A record with no usage and no latency (cache hits, reused recipes).
    pub fn free(agent_name: impl Into<String>) -> Self {
        Self::new(agent_name, TokenUsage::default(), Duration::ZERO)
    }
}
