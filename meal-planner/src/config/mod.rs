//! Application config: [`BaseConfig`] (Telegram + log + DB) plus provider, planning and blog
//! sections, all loaded from the environment after `.env`.

mod base;
mod planning;


use anyhow::Result;
use embedding::EnvEmbeddingConfig;
use llm_client::EnvLlmConfig;

pub use base::BaseConfig;
pub use planning::{GhostConfig, ModelConfig, PlanningConfig};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub base: BaseConfig,
    pub llm: EnvLlmConfig,
    pub models: ModelConfig,
    pub embedding: EnvEmbeddingConfig,
    pub planning: PlanningConfig,
    pub ghost: GhostConfig,
}

impl AppConfig {
    /// Load every section. `token` overrides BOT_TOKEN if provided.
    pub fn load(token: Option<String>) -> Result<Self> {
        Ok(Self {
            base: BaseConfig::load(token)?,
            llm: EnvLlmConfig::from_env()?,
            models: ModelConfig::from_env(),
            embedding: EnvEmbeddingConfig::from_env()?,
            planning: PlanningConfig::from_env()?,
            ghost: GhostConfig::from_env(),
        })
    }

    /// Fails fast on anything every command needs.
    pub fn validate(&self) -> Result<()> {
        self.base.validate()?;
        self.llm.validate()?;
        self.embedding.validate()?;
        self.planning.validate()?;
        self.ghost.validate()?;
        Ok(())
    }
}
