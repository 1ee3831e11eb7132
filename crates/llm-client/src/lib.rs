//! # Text-generation client abstraction
//!
//! Defines the [`TextGenerator`] trait used by every agent stage, the usage records
//! ([`TokenUsage`], [`AgentMeta`]) that flow into the metrics sink, and an OpenAI-compatible
//! implementation ([`ChatCompletionsClient`]) that asks for JSON-object output.
//!
//! Rate limiting is handled in [`retry`]: a bounded loop that sleeps for the server-suggested
//! wait. Dropping the future (e.g. via `tokio::time::timeout`) cancels a pending sleep.

use async_trait::async_trait;

pub mod config;
mod error;
mod openai_compatible;
pub mod retry;
mod types;

pub use config::EnvLlmConfig;
pub use error::LlmError;
pub use openai_compatible::{mask_token, ChatCompletionsClient};
pub use retry::{parse_retry_after, RetryPolicy};
pub use types::{AgentMeta, ContentResponse, TokenUsage};

/// Single-prompt text generation.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Returns generated content and token usage for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<ContentResponse, LlmError>;

    /// Model identifier, used in logs and metrics.
    fn model(&self) -> &str;
}
