//! Text-generation configuration loaded from the environment.

use anyhow::Result;
use std::env;

use crate::RetryPolicy;

pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Provider credentials and endpoint shared by every stage client.
#[derive(Debug, Clone)]
pub struct EnvLlmConfig {
    pub api_key: String,
    pub base_url: String,
    pub max_attempts: u32,
}

impl EnvLlmConfig {
    /// Load from environment variables.
    ///
    /// `LLM_API_KEY` (falls back to `GROQ_API_KEY`, then `OPENAI_API_KEY`), `LLM_BASE_URL`,
    /// `LLM_MAX_ATTEMPTS`.
    pub fn from_env() -> Result<Self> {
        let api_key = env::var("LLM_API_KEY")
            .or_else(|_| env::var("GROQ_API_KEY"))
            .or_else(|_| env::var("OPENAI_API_KEY"))
            .unwrap_or_default();
        let base_url = env::var("LLM_BASE_URL")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let max_attempts = match env::var("LLM_MAX_ATTEMPTS") {
            Ok(v) => v
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("LLM_MAX_ATTEMPTS must be a positive integer, got '{}'", v))?,
            Err(_) => RetryPolicy::default().max_attempts,
        };
        Ok(Self {
            api_key,
            base_url,
            max_attempts,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            anyhow::bail!("LLM_API_KEY (or GROQ_API_KEY / OPENAI_API_KEY) must be set");
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            anyhow::bail!("LLM_BASE_URL must start with http:// or https://");
        }
        if self.max_attempts == 0 {
            anyhow::bail!("LLM_MAX_ATTEMPTS must be at least 1");
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::default().with_max_attempts(self.max_attempts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear() {
        for key in [
            "LLM_API_KEY",
            "GROQ_API_KEY",
            "OPENAI_API_KEY",
            "LLM_BASE_URL",
            "LLM_MAX_ATTEMPTS",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_defaults_and_fallback_key() {
        clear();
        env::set_var("GROQ_API_KEY", "gsk_test");

        let config = EnvLlmConfig::from_env().unwrap();

        assert_eq!(config.api_key, "gsk_test");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.max_attempts, 3);
        assert!(config.validate().is_ok());
        clear();
    }

    #[test]
    #[serial]
    fn test_invalid_attempts() {
        clear();
        env::set_var("LLM_MAX_ATTEMPTS", "many");
        assert!(EnvLlmConfig::from_env().is_err());

        env::set_var("LLM_MAX_ATTEMPTS", "0");
        env::set_var("LLM_API_KEY", "k");
        assert!(EnvLlmConfig::from_env().unwrap().validate().is_err());
        clear();
    }
}
