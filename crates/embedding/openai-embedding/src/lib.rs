//! # OpenAI Embedding Service
//!
//! [`EmbeddingService`] implementation over the OpenAI embeddings API (or any OpenAI-compatible
//! endpoint via `base_url`), built on `async-openai`.
//!
//! ```rust,no_run
//! use openai_embedding::OpenAIEmbedding;
//! use embedding::EmbeddingService;
//!
//! async fn example() -> Result<(), anyhow::Error> {
//!     let service = OpenAIEmbedding::new("sk-...".to_string(), "text-embedding-3-small".to_string());
//!     let vector = service.embed("Title: Lentil soup").await?;
//!     println!("dimension: {}", vector.len());
//!     Ok(())
//! }
//! ```

use std::time::Duration;

use async_openai::{config::OpenAIConfig, types::CreateEmbeddingRequestArgs, Client};
use async_trait::async_trait;
use embedding::{EmbeddingService, EnvEmbeddingConfig};
use tracing::{debug, info, instrument, warn};

const EMBED_TIMEOUT: Duration = Duration::from_secs(30);

/// OpenAI embedding service. Holds the async-openai client and model name.
#[derive(Debug, Clone)]
pub struct OpenAIEmbedding {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAIEmbedding {
    pub fn new(api_key: String, model: String) -> Self {
        Self::new_with_base_url(api_key, model, None)
    }

    /// When `base_url` is `Some`, requests go to that OpenAI-compatible endpoint.
    pub fn new_with_base_url(api_key: String, model: String, base_url: Option<&str>) -> Self {
        let mut openai_config = OpenAIConfig::new().with_api_key(api_key);
        if let Some(url) = base_url.filter(|s| !s.is_empty()) {
            openai_config = openai_config.with_api_base(url);
        }
        Self {
            client: Client::with_config(openai_config),
            model,
        }
    }

    pub fn from_config(config: &EnvEmbeddingConfig) -> Self {
        Self::new_with_base_url(
            config.api_key.clone(),
            config.model.clone(),
            config.base_url.as_deref(),
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl EmbeddingService for OpenAIEmbedding {
    /// One request per text; fails on timeout, provider error or an empty vector.
    #[instrument(skip(self, text), fields(model = %self.model, text_len = text.len()))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>, anyhow::Error> {
        let request = CreateEmbeddingRequestArgs::default()
            .model(self.model.clone())
            .input(vec![text])
            .build()?;

        let response = tokio::time::timeout(EMBED_TIMEOUT, self.client.embeddings().create(request))
            .await
            .map_err(|_| {
                warn!(timeout_secs = EMBED_TIMEOUT.as_secs(), "embedding request timed out");
                anyhow::anyhow!("embedding request timed out after {:?}", EMBED_TIMEOUT)
            })?
            .map_err(|e| {
                warn!(error = %e, "embedding request failed");
                anyhow::Error::from(e)
            })?;
        debug!(items = response.data.len(), "embedding response received");

        let vector = response
            .data
            .into_iter()
            .next()
            .map(|item| item.embedding)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| anyhow::anyhow!("embedding response for model {} had no vector", self.model))?;

        info!(dimensions = vector.len(), "step: text embedded");
        Ok(vector)
    }
}
