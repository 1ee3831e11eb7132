//! Embedding configuration loaded from environment variables.

use anyhow::Result;
use std::env;

pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

#[derive(Debug, Clone)]
pub struct EnvEmbeddingConfig {
    pub provider: String,
    pub api_key: String,
    /// OpenAI-compatible endpoint override (`OPENAI_BASE_URL`).
    pub base_url: Option<String>,
    pub model: String,
}

impl EnvEmbeddingConfig {
    /// Load from environment variables.
    pub fn from_env() -> Result<Self> {
        let provider = env::var("EMBEDDING_PROVIDER").unwrap_or_else(|_| "openai".to_string());
        let api_key = env::var("EMBEDDING_API_KEY")
            .or_else(|_| env::var("OPENAI_API_KEY"))
            .unwrap_or_default();
        let base_url = env::var("OPENAI_BASE_URL")
            .ok()
            .filter(|s| !s.trim().is_empty());
        let model = env::var("EMBEDDING_MODEL")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string());
        Ok(Self {
            provider,
            api_key,
            base_url,
            model,
        })
    }

    /// Only the `openai` provider (and OpenAI-compatible endpoints) is supported.
    pub fn validate(&self) -> Result<()> {
        if !self.provider.eq_ignore_ascii_case("openai") {
            anyhow::bail!(
                "Unsupported EMBEDDING_PROVIDER '{}' (expected 'openai')",
                self.provider
            );
        }
        if self.api_key.trim().is_empty() {
            anyhow::bail!("EMBEDDING_API_KEY or OPENAI_API_KEY must be set");
        }
        Ok(())
    }
}
