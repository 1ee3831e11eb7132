//! OpenAI-compatible chat-completions client (OpenAI, Groq, and similar endpoints).
//!
//! Sends the prompt as a single user message after a fixed system message and requests
//! `response_format: json_object`. HTTP 429 becomes [`LlmError::RateLimited`] and is retried
//! through [`with_retry`](crate::retry::with_retry).

use std::time::{Duration, Instant};

use async_trait::async_trait;
use prompt::{ChatMessage, JSON_SYSTEM_MESSAGE};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::retry::{parse_retry_after, with_retry, RetryPolicy};
use crate::{ContentResponse, LlmError, TextGenerator, TokenUsage};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Masks a token for safe logging: first 7 and last 4 chars, e.g. `gsk_abc***wxyz`.
pub fn mask_token(token: &str) -> String {
    let len = token.len();
    if len <= 11 || !token.is_ascii() {
        return "***".to_string();
    }
    format!("{}***{}", &token[..7], &token[len - 4..])
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize, Default)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

/// [`TextGenerator`] over `POST {base_url}/chat/completions`.
#[derive(Debug, Clone)]
pub struct ChatCompletionsClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
    system_prompt: String,
    retry: RetryPolicy,
}

impl ChatCompletionsClient {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            api_key: api_key.into(),
            base_url: base_url.into(),
            model: model.into(),
            temperature: 0.1,
            system_prompt: JSON_SYSTEM_MESSAGE.to_string(),
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    async fn send_once(&self, messages: &[ChatMessage]) -> Result<ContentResponse, LlmError> {
        let body = ChatRequest {
            model: &self.model,
            messages: messages
                .iter()
                .map(|m| WireMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            temperature: self.temperature,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = self.retry.wait_for(parse_retry_after(&text));
            return Err(LlmError::RateLimited {
                retry_after,
                message: text,
            });
        }
        if !status.is_success() {
            warn!(status = status.as_u16(), body = %prompt::preview(&text, 300), "chat completion failed");
            return Err(LlmError::ApiError {
                status: status.as_u16(),
                message: text,
            });
        }

        let parsed: ChatResponse = serde_json::from_str(&text)?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| LlmError::InvalidResponse("no content generated".to_string()))?;
        let usage = parsed.usage.unwrap_or_default();

        Ok(ContentResponse {
            content,
            usage: TokenUsage {
                prompt_tokens: usage.prompt_tokens,
                completion_tokens: usage.completion_tokens,
                total_tokens: usage.total_tokens,
                model: self.model.clone(),
            },
        })
    }
}

#[async_trait]
impl TextGenerator for ChatCompletionsClient {
    #[instrument(skip(self, prompt), fields(model = %self.model, prompt_len = prompt.len()))]
    async fn generate(&self, prompt: &str) -> Result<ContentResponse, LlmError> {
        let messages = [
            ChatMessage::system(self.system_prompt.as_str()),
            ChatMessage::user(prompt),
        ];
        let start = Instant::now();
        debug!(endpoint = %self.endpoint(), "step: chat completion request");

        let messages = &messages;
        let response = with_retry(&self.retry, move || self.send_once(messages)).await?;

        info!(
            prompt_tokens = response.usage.prompt_tokens,
            completion_tokens = response.usage.completion_tokens,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "step: chat completion done"
        );
        Ok(response)
    }

    fn model(&self) -> &str {
        &self.model
    }
}
