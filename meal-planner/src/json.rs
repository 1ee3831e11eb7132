//! Parsing of model output.
//!
//! Every agent stage asks for a single JSON object. [`parse_agent_json`] turns the reply into a
//! typed value or an [`AgentError::MalformedOutput`] that keeps the raw text and the stage's
//! usage record. [`generate_validated`] additionally checks the parsed value's shape and fails
//! with [`AgentError::InvalidShape`]. The `lenient_*` deserializers absorb the usual type drift in model output
//! (numbers where strings were asked for, a string where a list was asked for).

use std::time::Instant;

use llm_client::{AgentMeta, ContentResponse, TextGenerator};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use tracing::{debug, warn};

use crate::core::AgentError;

/// Strips surrounding whitespace and a Markdown code fence, if present.
fn unfence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

pub fn parse_agent_json<T: DeserializeOwned>(
    stage: &'static str,
    response: &ContentResponse,
    meta: &AgentMeta,
) -> Result<T, AgentError> {
    serde_json::from_str(unfence(&response.content)).map_err(|source| AgentError::MalformedOutput {
        stage,
        raw: response.content.clone(),
        meta: meta.clone(),
        source,
    })
}

/// Runs one agent stage: generate, time it, parse the reply as `T`.
pub async fn generate_json<T: DeserializeOwned>(
    generator: &dyn TextGenerator,
    stage: &'static str,
    prompt: &str,
) -> Result<(T, AgentMeta), AgentError> {
    let (value, _, meta) = generate_raw(generator, stage, prompt).await?;
    Ok((value, meta))
}

/// Like [`generate_json`], but `check` must accept the parsed value. A rejection keeps the raw
/// reply and the usage record.
pub async fn generate_validated<T, F>(
    generator: &dyn TextGenerator,
    stage: &'static str,
    prompt: &str,
    check: F,
) -> Result<(T, AgentMeta), AgentError>
where
    T: DeserializeOwned,
    F: FnOnce(&T) -> Result<(), String>,
{
    let (value, raw, meta) = generate_raw(generator, stage, prompt).await?;
    if let Err(reason) = check(&value) {
        warn!(stage, reason = %reason, "Stage reply has the wrong shape");
        return Err(AgentError::InvalidShape {
            stage,
            raw,
            meta,
            reason,
        });
    }
    Ok((value, meta))
}

async fn generate_raw<T: DeserializeOwned>(
    generator: &dyn TextGenerator,
    stage: &'static str,
    prompt: &str,
) -> Result<(T, String, AgentMeta), AgentError> {
    let started = Instant::now();
    let response = generator
        .generate(prompt)
        .await
        .map_err(AgentError::generation(stage))?;
    let meta = AgentMeta::new(stage, response.usage.clone(), started.elapsed());
    debug!(
        stage,
        model = generator.model(),
        prompt_tokens = meta.usage.prompt_tokens,
        completion_tokens = meta.usage.completion_tokens,
        latency_ms = meta.latency.as_millis() as u64,
        "step: stage response received"
    );
    let value = parse_agent_json(stage, &response, &meta)?;
    Ok((value, response.content, meta))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl Scalar {
    fn into_string(self) -> String {
        match self {
            Scalar::Text(s) => s,
            Scalar::Int(n) => n.to_string(),
            Scalar::Float(f) => f.to_string(),
            Scalar::Bool(b) => b.to_string(),
        }
    }
}

/// A string field that may arrive as a number, bool or null.
pub fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(Option::<Scalar>::deserialize(d)?
        .map(Scalar::into_string)
        .unwrap_or_default())
}

/// An optional id that may arrive as a number; empty strings become `None`.
pub fn lenient_opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<Scalar>::deserialize(d)?
        .map(Scalar::into_string)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrList {
    One(String),
    Many(Vec<Scalar>),
}

/// A list of strings that may arrive as one newline-separated string.
pub fn string_or_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    let items = match Option::<StringOrList>::deserialize(d)? {
        None => Vec::new(),
        Some(StringOrList::One(text)) => text.lines().map(str::to_string).collect(),
        Some(StringOrList::Many(items)) => items.into_iter().map(Scalar::into_string).collect(),
    };
    Ok(items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect())
}
